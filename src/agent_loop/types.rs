//! Core run types for the agent loop.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;

use crate::agent::AgentSpec;
use crate::context::RunContext;
use crate::error::RociError;
use crate::guardrail::{output_text, GuardrailResult, InputGuardrail, OutputGuardrail};
use crate::hooks::Hooks;
use crate::session::Session;
use crate::types::{ModelMessage, Usage};

/// User-supplied input of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunInput {
    Text(String),
    Messages(Vec<ModelMessage>),
}

impl RunInput {
    pub fn into_messages(self) -> Vec<ModelMessage> {
        match self {
            Self::Text(text) => vec![ModelMessage::user(text)],
            Self::Messages(messages) => messages,
        }
    }
}

impl From<&str> for RunInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RunInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<ModelMessage>> for RunInput {
    fn from(messages: Vec<ModelMessage>) -> Self {
        Self::Messages(messages)
    }
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub context: RunContext,
    pub session: Option<Session>,
    /// Overrides the runner's default turn budget.
    pub max_turns: Option<usize>,
    /// Run-level listeners, called before the active agent's own hooks.
    pub hooks: Hooks,
    /// Applied in addition to the starting agent's input guardrails.
    pub input_guardrails: Vec<InputGuardrail>,
    /// Applied in addition to the producing agent's output guardrails.
    pub output_guardrails: Vec<OutputGuardrail>,
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_input_guardrail(mut self, guardrail: InputGuardrail) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    pub fn with_output_guardrail(mut self, guardrail: OutputGuardrail) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Outcome of a single tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolCallStatus {
    Completed,
    /// The tool ran and returned an error.
    Failed,
    /// Arguments did not match the tool's schema; the tool did not run.
    InvalidArguments,
    NotFound,
    NotEnabled,
    /// Not executed because the same response handed off control.
    Skipped,
    TimedOut,
}

impl ToolCallStatus {
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Execution record for one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub tool_name: String,
    /// Agent whose turn requested the call.
    pub agent: String,
    pub arguments: serde_json::Value,
    pub status: ToolCallStatus,
    /// Output on success, `{"error": ...}` otherwise.
    pub result: serde_json::Value,
    pub elapsed_ms: u64,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Final output: a JSON string for plain text, or the structured value.
    pub final_output: serde_json::Value,
    pub last_agent: Arc<AgentSpec>,
    /// Input of this run.
    pub input: Vec<ModelMessage>,
    /// Session history, then input, then new items.
    pub history: Vec<ModelMessage>,
    /// Items produced by this run.
    pub new_items: Vec<ModelMessage>,
    /// Model invocations performed; the turn budget counts these.
    pub turns: usize,
    /// Model invocations plus executed tool batches.
    pub steps: usize,
    pub usage: Usage,
    pub tool_calls: Vec<ToolCallRecord>,
    pub input_guardrail_results: Vec<GuardrailResult>,
    pub output_guardrail_results: Vec<GuardrailResult>,
}

impl RunResult {
    /// Final output as text.
    pub fn final_output_text(&self) -> String {
        output_text(&self.final_output)
    }

    /// Decode the final output as `T`.
    ///
    /// String outputs holding JSON are parsed first.
    pub fn final_output_as<T: DeserializeOwned>(&self) -> Result<T, RociError> {
        if let serde_json::Value::String(raw) = &self.final_output {
            if let Ok(parsed) = serde_json::from_str::<T>(raw) {
                return Ok(parsed);
            }
        }
        Ok(T::deserialize(&self.final_output)?)
    }

    pub fn last_agent_name(&self) -> &str {
        &self.last_agent.name
    }

    /// Input followed by new items; feed into the next run to continue.
    pub fn to_input_list(&self) -> Vec<ModelMessage> {
        self.input
            .iter()
            .chain(self.new_items.iter())
            .cloned()
            .collect()
    }
}
