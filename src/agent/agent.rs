//! Agent definitions: instructions, tools, hand-offs, guardrails, settings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::behavior::ToolUseBehavior;
use super::handoff::Handoff;
use super::output::OutputContract;
use super::settings::ModelSettings;
use crate::context::RunContext;
use crate::error::RociError;
use crate::guardrail::{InputGuardrail, OutputGuardrail};
use crate::hooks::Hooks;
use crate::provider::ModelProvider;
use crate::tools::registry::duplicate_names;
use crate::tools::{Tool, ToolDefinition, ToolRegistry};

/// Computes instructions from the run context and the agent.
pub type InstructionFn = Arc<dyn Fn(&RunContext, &AgentSpec) -> String + Send + Sync>;

/// Static or computed system instructions.
#[derive(Clone)]
pub enum Instructions {
    Static(String),
    Dynamic(InstructionFn),
}

impl Instructions {
    pub fn resolve(&self, ctx: &RunContext, agent: &AgentSpec) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Dynamic(build) => build(ctx, agent),
        }
    }
}

impl Default for Instructions {
    fn default() -> Self {
        Self::Static(String::new())
    }
}

impl From<&str> for Instructions {
    fn from(text: &str) -> Self {
        Self::Static(text.to_string())
    }
}

impl From<String> for Instructions {
    fn from(text: String) -> Self {
        Self::Static(text)
    }
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A named bundle of instructions, tools, hand-offs, and policies.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use roci_agents::agent::AgentSpec;
///
/// let spanish = Arc::new(AgentSpec::new("Spanish").with_instructions("Reply in Spanish."));
/// let triage = AgentSpec::new("Triage")
///     .with_instructions("Route the user to the right agent.")
///     .with_handoff(spanish);
///
/// assert!(triage.validate().is_ok());
/// assert_eq!(triage.handoff_definitions()[0].name, "transfer_to_spanish");
/// ```
#[derive(Clone, Default)]
pub struct AgentSpec {
    pub name: String,
    pub instructions: Instructions,
    /// Model reference passed through to the provider.
    pub model: Option<String>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub handoffs: Vec<Handoff>,
    /// Shown to other agents in this agent's hand-off tool description.
    pub handoff_description: Option<String>,
    pub output_contract: Option<OutputContract>,
    pub input_guardrails: Vec<InputGuardrail>,
    pub output_guardrails: Vec<OutputGuardrail>,
    pub tool_use_behavior: ToolUseBehavior,
    pub model_settings: ModelSettings,
    pub hooks: Hooks,
    /// Overrides the runner's provider for this agent.
    pub provider: Option<Arc<dyn ModelProvider>>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Rename; useful on a clone of an existing agent.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<Instructions>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Compute instructions per turn from the context and the agent.
    pub fn with_dynamic_instructions<F>(mut self, build: F) -> Self
    where
        F: Fn(&RunContext, &AgentSpec) -> String + Send + Sync + 'static,
    {
        self.instructions = Instructions::Dynamic(Arc::new(build));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        self.tools.extend(tools);
        self
    }

    pub fn with_handoff(mut self, handoff: impl Into<Handoff>) -> Self {
        self.handoffs.push(handoff.into());
        self
    }

    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    pub fn with_output_contract(mut self, contract: OutputContract) -> Self {
        self.output_contract = Some(contract);
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

    pub fn with_tool_use_behavior(mut self, behavior: ToolUseBehavior) -> Self {
        self.tool_use_behavior = behavior;
        self
    }

    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn resolve_instructions(&self, ctx: &RunContext) -> String {
        self.instructions.resolve(ctx, self)
    }

    /// Registry over this agent's function tools.
    pub fn tool_registry(&self) -> Result<ToolRegistry, RociError> {
        ToolRegistry::from_tools(self.tools.iter().cloned())
            .map_err(|e| RociError::Configuration(format!("agent '{}': {e}", self.name)))
    }

    pub fn handoff_definitions(&self) -> Vec<ToolDefinition> {
        self.handoffs.iter().map(Handoff::definition).collect()
    }

    /// Declared hand-off matching `name` by agent or tool name.
    pub fn find_handoff(&self, name: &str) -> Option<&Handoff> {
        self.handoffs.iter().find(|h| h.matches(name))
    }

    /// Declared hand-off whose tool name is exactly `tool_name`.
    pub fn handoff_for_tool(&self, tool_name: &str) -> Option<&Handoff> {
        self.handoffs.iter().find(|h| h.tool_name() == tool_name)
    }

    /// Check this agent and every reachable hand-off target.
    ///
    /// Rejects empty names, duplicate tool names (function and hand-off tools
    /// share one namespace), and two distinct agents sharing a name.
    pub fn validate(&self) -> Result<(), RociError> {
        let mut seen = HashMap::new();
        self.validate_into(&mut seen)
    }

    fn validate_into<'a>(
        &'a self,
        seen: &mut HashMap<&'a str, &'a AgentSpec>,
    ) -> Result<(), RociError> {
        match seen.get(self.name.as_str()) {
            Some(other) if std::ptr::eq(*other, self) => return Ok(()),
            Some(_) => {
                return Err(RociError::Configuration(format!(
                    "two different agents are named '{}'",
                    self.name
                )))
            }
            None => {}
        }
        if self.name.trim().is_empty() {
            return Err(RociError::Configuration("agent name must not be empty".into()));
        }
        seen.insert(self.name.as_str(), self);

        let handoff_names: Vec<String> = self.handoffs.iter().map(Handoff::tool_name).collect();
        let names = self
            .tools
            .iter()
            .map(|t| t.name())
            .chain(handoff_names.iter().map(String::as_str));
        let dupes = duplicate_names(names);
        if !dupes.is_empty() {
            return Err(RociError::Configuration(format!(
                "agent '{}' declares duplicate tool names: {}",
                self.name,
                dupes.join(", ")
            )));
        }

        for handoff in &self.handoffs {
            handoff.target().validate_into(seen)?;
        }
        Ok(())
    }
}

impl fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSpec")
            .field("name", &self.name)
            .field("instructions", &self.instructions)
            .field("model", &self.model)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("handoffs", &self.handoffs)
            .field("output_contract", &self.output_contract)
            .field("tool_use_behavior", &self.tool_use_behavior)
            .field("model_settings", &self.model_settings)
            .finish_non_exhaustive()
    }
}
