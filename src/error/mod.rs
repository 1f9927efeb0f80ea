//! Error types for roci-agents.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::ModelMessage;

/// State of a run at the moment it failed.
///
/// Every fatal run outcome carries one of these so callers can inspect the
/// history that accumulated before the failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Name of the agent that was active when the run stopped.
    pub last_agent: String,
    /// Model invocations performed.
    pub turns: usize,
    /// Full conversation history up to the failure point.
    pub history: Vec<ModelMessage>,
}

impl RunDiagnostics {
    pub fn new(last_agent: impl Into<String>, turns: usize, history: Vec<ModelMessage>) -> Self {
        Self {
            last_agent: last_agent.into(),
            turns,
            history,
        }
    }
}

/// Primary error type for all roci-agents operations.
#[derive(Error, Debug)]
pub enum RociError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Tool execution error ({tool_name}): {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input guardrail '{guardrail}' tripped")]
    InputRejected {
        guardrail: String,
        output_info: serde_json::Value,
        diagnostics: Box<RunDiagnostics>,
    },

    #[error("Output guardrail '{guardrail}' tripped")]
    OutputRejected {
        guardrail: String,
        output_info: serde_json::Value,
        /// The discarded candidate output.
        output: serde_json::Value,
        diagnostics: Box<RunDiagnostics>,
    },

    #[error("Max turns ({max_turns}) exceeded")]
    MaxTurnsExceeded {
        max_turns: usize,
        diagnostics: Box<RunDiagnostics>,
    },

    #[error("Agent '{agent}' cannot hand off to unknown target '{target}'")]
    UnknownHandoffTarget {
        agent: String,
        target: String,
        diagnostics: Box<RunDiagnostics>,
    },

    #[error("Output of agent '{agent}' violates contract '{contract}': {message}")]
    OutputContractViolation {
        agent: String,
        contract: String,
        message: String,
        diagnostics: Box<RunDiagnostics>,
    },

    #[error("Run canceled")]
    Canceled { diagnostics: Box<RunDiagnostics> },
}

/// Coarse classification of a [`RociError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Provider,
    RateLimit,
    Timeout,
    Serialization,
    Io,
    ToolExecution,
    Guardrail,
    TurnLimit,
    Handoff,
    OutputContract,
    Canceled,
    Unknown,
}

impl RociError {
    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::InvalidArgument(_) => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Io,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Provider { .. } | Self::Stream(_) => ErrorCategory::Provider,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::InputRejected { .. } | Self::OutputRejected { .. } => ErrorCategory::Guardrail,
            Self::MaxTurnsExceeded { .. } => ErrorCategory::TurnLimit,
            Self::UnknownHandoffTarget { .. } => ErrorCategory::Handoff,
            Self::OutputContractViolation { .. } => ErrorCategory::OutputContract,
            Self::Canceled { .. } => ErrorCategory::Canceled,
        }
    }

    /// Whether a model call that failed with this error may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Timeout
        )
    }

    /// Run diagnostics, for errors that terminated a run.
    pub fn diagnostics(&self) -> Option<&RunDiagnostics> {
        match self {
            Self::InputRejected { diagnostics, .. }
            | Self::OutputRejected { diagnostics, .. }
            | Self::MaxTurnsExceeded { diagnostics, .. }
            | Self::UnknownHandoffTarget { diagnostics, .. }
            | Self::OutputContractViolation { diagnostics, .. }
            | Self::Canceled { diagnostics } => Some(diagnostics),
            _ => None,
        }
    }

    /// History accumulated before the run failed.
    pub fn history(&self) -> Option<&[ModelMessage]> {
        self.diagnostics().map(|d| d.history.as_slice())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RociError>;
