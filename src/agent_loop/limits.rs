use std::time::Duration;

use super::types::RunOptions;
use crate::config::RunnerConfig;

/// Effective limits of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunLimits {
    pub(crate) max_turns: usize,
    pub(crate) max_tool_concurrency: Option<usize>,
    pub(crate) tool_timeout: Option<Duration>,
}

impl RunLimits {
    /// Per-run options win over the runner configuration.
    ///
    /// A zero turn budget is accepted: the run fails before calling the model.
    pub(crate) fn resolve(config: &RunnerConfig, options: &RunOptions) -> Self {
        Self {
            max_turns: options.max_turns.unwrap_or(config.default_max_turns),
            max_tool_concurrency: config.max_tool_concurrency.filter(|limit| *limit > 0),
            tool_timeout: config.tool_timeout(),
        }
    }
}
