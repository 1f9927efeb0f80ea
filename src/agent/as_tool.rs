//! Exposing an agent to other agents as a function tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::AgentSpec;
use crate::agent_loop::{RunOptions, Runner};
use crate::error::RociError;
use crate::tools::{AgentToolParameters, Tool, ToolArguments, ToolExecutionContext};

/// Tool that runs a nested agent on the `input` argument and returns its
/// final output.
///
/// Unlike a hand-off, control stays with the calling agent. The nested run
/// shares the caller's [`RunContext`](crate::context::RunContext) but none of
/// its history.
#[derive(Clone)]
pub struct AgentAsTool {
    runner: Runner,
    agent: Arc<AgentSpec>,
    name: String,
    description: String,
    parameters: AgentToolParameters,
    max_turns: Option<usize>,
}

impl AgentAsTool {
    pub fn new(
        runner: Runner,
        agent: Arc<AgentSpec>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            agent,
            name: name.into(),
            description: description.into(),
            parameters: AgentToolParameters::object()
                .string("input", "Input for the agent", true)
                .build(),
            max_turns: None,
        }
    }

    /// Turn budget of the nested run.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn agent(&self) -> &Arc<AgentSpec> {
        &self.agent
    }
}

#[async_trait]
impl Tool for AgentAsTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, RociError> {
        let input = args.get_str("input")?;
        let mut options = RunOptions::new().with_context(ctx.run_context.clone());
        if let Some(max_turns) = self.max_turns {
            options = options.with_max_turns(max_turns);
        }

        tracing::debug!(tool = %self.name, agent = %self.agent.name, "running agent as tool");
        let result = self.runner.run(&self.agent, input, options).await?;
        Ok(result.final_output)
    }
}

impl std::fmt::Debug for AgentAsTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentAsTool")
            .field("name", &self.name)
            .field("agent", &self.agent.name)
            .finish()
    }
}

impl AgentSpec {
    /// Wrap this agent as a tool other agents can call.
    pub fn as_tool(
        self: &Arc<Self>,
        runner: &Runner,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> AgentAsTool {
        AgentAsTool::new(runner.clone(), Arc::clone(self), name, description)
    }
}
