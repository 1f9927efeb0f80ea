//! Runner configuration (layered: per-run option > env > TOML file > defaults).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RociError;
use crate::util::retry::RetryPolicy;

const DEFAULT_MAX_TURNS: usize = 10;
const MAX_TURNS_ENV: &str = "ROCI_AGENTS_MAX_TURNS";
const MAX_TOOL_CONCURRENCY_ENV: &str = "ROCI_AGENTS_MAX_TOOL_CONCURRENCY";
const TOOL_TIMEOUT_MS_ENV: &str = "ROCI_AGENTS_TOOL_TIMEOUT_MS";
const MODEL_RETRY_ATTEMPTS_ENV: &str = "ROCI_AGENTS_MODEL_RETRY_ATTEMPTS";
const SESSION_DIR_ENV: &str = "ROCI_AGENTS_SESSION_DIR";

/// Backoff settings for model calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for ModelRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl ModelRetryConfig {
    /// Retry policy for these settings.
    ///
    /// A multiplier that is not a positive finite number falls back to 1.0
    /// (constant backoff), and the initial backoff never exceeds the cap.
    pub fn policy(&self) -> RetryPolicy {
        let multiplier = if self.multiplier.is_finite() && self.multiplier > 0.0 {
            self.multiplier
        } else {
            1.0
        };
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms.min(self.max_backoff_ms)),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier,
        }
    }
}

/// Settings shared by every run of a [`Runner`](crate::agent_loop::Runner).
///
/// ```
/// use roci_agents::config::RunnerConfig;
///
/// let config = RunnerConfig::from_toml_str("default_max_turns = 4").unwrap();
/// assert_eq!(config.default_max_turns, 4);
/// assert_eq!(config.max_tool_concurrency, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Model invocations allowed per run when the run does not say otherwise.
    pub default_max_turns: usize,
    /// Upper bound on tools executing at once within a turn.
    pub max_tool_concurrency: Option<usize>,
    /// Per-tool execution timeout.
    pub tool_timeout_ms: Option<u64>,
    pub model_retry: ModelRetryConfig,
    /// Directory for [`FileSessionStore`](crate::session::FileSessionStore).
    pub session_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_max_turns: DEFAULT_MAX_TURNS,
            max_tool_concurrency: None,
            tool_timeout_ms: None,
            model_retry: ModelRetryConfig::default(),
            session_dir: None,
        }
    }
}

impl RunnerConfig {
    /// Defaults overlaid with environment variables (`.env` is loaded first).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, RociError> {
        toml::from_str(raw)
            .map_err(|e| RociError::Configuration(format!("invalid runner config: {e}")))
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RociError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let _ = dotenvy::dotenv();
        Ok(Self::from_toml_str(&raw)?.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from `lookup`, keyed by the `ROCI_AGENTS_*` names.
    ///
    /// Unparseable or zero values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(turns) = lookup(MAX_TURNS_ENV).and_then(|v| parse_positive(&v)) {
            self.default_max_turns = turns as usize;
        }
        if let Some(limit) = lookup(MAX_TOOL_CONCURRENCY_ENV).and_then(|v| parse_positive(&v)) {
            self.max_tool_concurrency = Some(limit as usize);
        }
        if let Some(ms) = lookup(TOOL_TIMEOUT_MS_ENV).and_then(|v| parse_positive(&v)) {
            self.tool_timeout_ms = Some(ms);
        }
        if let Some(attempts) = lookup(MODEL_RETRY_ATTEMPTS_ENV).and_then(|v| parse_positive(&v)) {
            self.model_retry.max_attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
        }
        if let Some(dir) = lookup(SESSION_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.session_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn with_default_max_turns(mut self, turns: usize) -> Self {
        self.default_max_turns = turns;
        self
    }

    pub fn with_max_tool_concurrency(mut self, limit: usize) -> Self {
        self.max_tool_concurrency = Some(limit);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_model_retry(mut self, retry: ModelRetryConfig) -> Self {
        self.model_retry = retry;
        self
    }

    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    /// Configured session directory, else `~/.roci/sessions`.
    pub fn session_dir(&self) -> PathBuf {
        self.session_dir.clone().unwrap_or_else(default_session_dir)
    }
}

/// `~/.roci/sessions`, falling back to a relative path without a home dir.
pub fn default_session_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".roci"))
        .unwrap_or_else(|| PathBuf::from(".roci"))
        .join("sessions")
}

fn parse_positive(value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(parsed) => Some(parsed),
    }
}
