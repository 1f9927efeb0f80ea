//! Tests for configuration system.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use roci_agents::config::{ModelRetryConfig, RunnerConfig};
use roci_agents::error::RociError;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 5] = [
    "ROCI_AGENTS_MAX_TURNS",
    "ROCI_AGENTS_MAX_TOOL_CONCURRENCY",
    "ROCI_AGENTS_TOOL_TIMEOUT_MS",
    "ROCI_AGENTS_MODEL_RETRY_ATTEMPTS",
    "ROCI_AGENTS_SESSION_DIR",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clean_env() -> EnvGuard {
    let guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    guard
}

#[test]
fn from_env_maps_every_variable() {
    let _env_lock = env_lock_guard();
    let _env_guard = clean_env();

    std::env::set_var("ROCI_AGENTS_MAX_TURNS", "25");
    std::env::set_var("ROCI_AGENTS_MAX_TOOL_CONCURRENCY", "4");
    std::env::set_var("ROCI_AGENTS_TOOL_TIMEOUT_MS", "1500");
    std::env::set_var("ROCI_AGENTS_MODEL_RETRY_ATTEMPTS", "5");
    std::env::set_var("ROCI_AGENTS_SESSION_DIR", "/var/lib/roci/sessions");

    let config = RunnerConfig::from_env();

    assert_eq!(config.default_max_turns, 25);
    assert_eq!(config.max_tool_concurrency, Some(4));
    assert_eq!(config.tool_timeout(), Some(Duration::from_millis(1500)));
    assert_eq!(config.model_retry.max_attempts, 5);
    assert_eq!(config.session_dir(), PathBuf::from("/var/lib/roci/sessions"));
}

#[test]
fn from_env_without_variables_uses_defaults() {
    let _env_lock = env_lock_guard();
    let _env_guard = clean_env();

    let config = RunnerConfig::from_env();

    assert_eq!(config.default_max_turns, 10);
    assert_eq!(config.max_tool_concurrency, None);
    assert!(config.session_dir().ends_with("sessions"));
}

#[test]
fn load_reads_toml_then_environment_wins() {
    let _env_lock = env_lock_guard();
    let _env_guard = clean_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roci-agents.toml");
    std::fs::write(
        &path,
        r#"
default_max_turns = 6
tool_timeout_ms = 2000

[model_retry]
max_attempts = 2
initial_backoff_ms = 100
"#,
    )
    .unwrap();
    std::env::set_var("ROCI_AGENTS_MAX_TURNS", "8");

    let config = RunnerConfig::load(&path).unwrap();

    assert_eq!(config.default_max_turns, 8);
    assert_eq!(config.tool_timeout(), Some(Duration::from_secs(2)));
    assert_eq!(
        config.model_retry,
        ModelRetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 100,
            ..ModelRetryConfig::default()
        }
    );
}

#[test]
fn load_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RunnerConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, RociError::Io(_)));
}

#[test]
fn malformed_toml_is_a_configuration_error() {
    let err = RunnerConfig::from_toml_str("default_max_turns = \"many\"").unwrap_err();
    assert!(matches!(err, RociError::Configuration(_)));
}
