//! What happens after an agent's tools have run.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RunContext;

/// Result of one function tool, as seen by a tool-use policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionToolResult {
    pub tool_name: String,
    pub call_id: String,
    pub output: Value,
    pub is_error: bool,
}

/// Decision returned by a custom tool-use finalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsToFinalOutputResult {
    pub is_final_output: bool,
    pub final_output: Option<Value>,
}

impl ToolsToFinalOutputResult {
    pub fn not_final() -> Self {
        Self::default()
    }

    pub fn final_output(output: Value) -> Self {
        Self {
            is_final_output: true,
            final_output: Some(output),
        }
    }
}

/// Caller-supplied finalizer over a turn's tool results.
pub type ToolsToFinalOutput =
    Arc<dyn Fn(&RunContext, &[FunctionToolResult]) -> ToolsToFinalOutputResult + Send + Sync>;

/// Policy applied after a batch of function tools completes.
#[derive(Clone, Default)]
pub enum ToolUseBehavior {
    /// Feed the results back to the model.
    #[default]
    RunLlmAgain,
    /// The first tool's result is the final output.
    StopOnFirstTool,
    /// Stop when any of these tools was called; its result is the final output.
    StopAtTools(Vec<String>),
    Custom(ToolsToFinalOutput),
}

impl ToolUseBehavior {
    pub fn stop_at_tools<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::StopAtTools(names.into_iter().map(Into::into).collect())
    }

    pub fn custom<F>(finalizer: F) -> Self
    where
        F: Fn(&RunContext, &[FunctionToolResult]) -> ToolsToFinalOutputResult
            + Send
            + Sync
            + 'static,
    {
        Self::Custom(Arc::new(finalizer))
    }

    /// Final output for this batch, or `None` to call the model again.
    pub fn final_output(&self, ctx: &RunContext, results: &[FunctionToolResult]) -> Option<Value> {
        match self {
            Self::RunLlmAgain => None,
            Self::StopOnFirstTool => results.first().map(|r| r.output.clone()),
            Self::StopAtTools(names) => results
                .iter()
                .find(|r| names.iter().any(|n| n == &r.tool_name))
                .map(|r| r.output.clone()),
            Self::Custom(finalizer) => {
                let decision = finalizer(ctx, results);
                decision
                    .is_final_output
                    .then(|| decision.final_output.unwrap_or(Value::Null))
            }
        }
    }
}

impl fmt::Debug for ToolUseBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunLlmAgain => f.write_str("RunLlmAgain"),
            Self::StopOnFirstTool => f.write_str("StopOnFirstTool"),
            Self::StopAtTools(names) => f.debug_tuple("StopAtTools").field(names).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
