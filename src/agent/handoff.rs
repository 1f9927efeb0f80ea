//! Hand-off targets.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::AgentSpec;
use crate::context::RunContext;
use crate::tools::{AgentToolParameters, ToolDefinition};

/// Callback invoked when control passes to the hand-off target.
pub type OnHandoff = Arc<dyn Fn(&RunContext, &Value) + Send + Sync>;

/// A declared transfer target of an agent.
///
/// The model sees each hand-off as a parameterless tool; calling it (or
/// emitting an explicit hand-off signal naming the target) moves the run to
/// the target agent.
#[derive(Clone)]
pub struct Handoff {
    target: Arc<AgentSpec>,
    tool_name: Option<String>,
    tool_description: Option<String>,
    on_handoff: Option<OnHandoff>,
}

impl Handoff {
    pub fn new(target: Arc<AgentSpec>) -> Self {
        Self {
            target,
            tool_name: None,
            tool_description: None,
            on_handoff: None,
        }
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    pub fn with_tool_description(mut self, description: impl Into<String>) -> Self {
        self.tool_description = Some(description.into());
        self
    }

    pub fn with_on_handoff<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RunContext, &Value) + Send + Sync + 'static,
    {
        self.on_handoff = Some(Arc::new(callback));
        self
    }

    pub fn target(&self) -> &Arc<AgentSpec> {
        &self.target
    }

    /// Tool name shown to the model.
    pub fn tool_name(&self) -> String {
        self.tool_name
            .clone()
            .unwrap_or_else(|| default_tool_name(&self.target.name))
    }

    pub fn tool_description(&self) -> String {
        if let Some(description) = &self.tool_description {
            return description.clone();
        }
        let mut description = format!(
            "Handoff to the {} agent to handle the request.",
            self.target.name
        );
        if let Some(extra) = &self.target.handoff_description {
            description.push(' ');
            description.push_str(extra);
        }
        description
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.tool_name(),
            description: self.tool_description(),
            parameters: AgentToolParameters::empty().schema,
        }
    }

    /// Whether `name` refers to this hand-off, by agent or tool name.
    pub fn matches(&self, name: &str) -> bool {
        self.target.name == name || self.tool_name() == name
    }

    pub(crate) fn notify(&self, ctx: &RunContext, payload: &Value) {
        if let Some(callback) = &self.on_handoff {
            callback(ctx, payload);
        }
    }
}

impl From<Arc<AgentSpec>> for Handoff {
    fn from(target: Arc<AgentSpec>) -> Self {
        Self::new(target)
    }
}

impl From<AgentSpec> for Handoff {
    fn from(target: AgentSpec) -> Self {
        Self::new(Arc::new(target))
    }
}

impl fmt::Debug for Handoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handoff")
            .field("target", &self.target.name)
            .field("tool_name", &self.tool_name())
            .field("has_callback", &self.on_handoff.is_some())
            .finish()
    }
}

/// `transfer_to_<agent name in snake case>`.
pub fn default_tool_name(agent_name: &str) -> String {
    let mut snake = String::with_capacity(agent_name.len());
    for ch in agent_name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            snake.push(ch.to_ascii_lowercase());
        } else if !snake.ends_with('_') {
            snake.push('_');
        }
    }
    format!("transfer_to_{}", snake.trim_matches('_'))
}
