//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::types::{AgentToolParameters, ToolDefinition};
use crate::agent::AgentSpec;
use crate::context::RunContext;
use crate::error::RociError;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Caller state of the current run.
    pub run_context: RunContext,
    /// Call id assigned by the model.
    pub tool_call_id: String,
    /// Tool name as requested by the model.
    pub tool_name: String,
    /// Agent whose turn requested the call.
    pub agent_name: String,
}

impl ToolExecutionContext {
    pub fn new(run_context: RunContext) -> Self {
        Self {
            run_context,
            tool_call_id: String::new(),
            tool_name: String::new(),
            agent_name: String::new(),
        }
    }
}

/// Core tool trait -- implement to create custom tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &AgentToolParameters;

    /// Whether the tool is offered to `agent` this turn.
    ///
    /// Evaluated fresh before every model call, so the answer may change as
    /// the caller's state changes during a run.
    fn is_enabled(&self, _ctx: &RunContext, _agent: &AgentSpec) -> bool {
        true
    }

    /// Execute the tool with validated arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, RociError>;

    /// Schema presented to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
        }
    }
}

type ToolHandler = dyn Fn(
        ToolArguments,
        ToolExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, RociError>> + Send>>
    + Send
    + Sync;

/// Predicate deciding whether a tool is offered for a given context and agent.
pub type EnabledPredicate = Arc<dyn Fn(&RunContext, &AgentSpec) -> bool + Send + Sync>;

/// Closure-based tool for quick tool creation.
#[derive(Clone)]
pub struct AgentTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    handler: Arc<ToolHandler>,
    enabled: Option<EnabledPredicate>,
}

impl AgentTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, RociError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
            enabled: None,
        }
    }

    /// Attach an enablement predicate.
    pub fn with_enabled<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&RunContext, &AgentSpec) -> bool + Send + Sync + 'static,
    {
        self.enabled = Some(Arc::new(predicate));
        self
    }

    /// Shorthand for a statically enabled or disabled tool.
    pub fn with_enabled_flag(self, enabled: bool) -> Self {
        self.with_enabled(move |_, _| enabled)
    }

    pub fn into_arc(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    fn is_enabled(&self, ctx: &RunContext, agent: &AgentSpec) -> bool {
        self.enabled
            .as_ref()
            .map_or(true, |predicate| predicate(ctx, agent))
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, RociError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("has_predicate", &self.enabled.is_some())
            .finish()
    }
}
