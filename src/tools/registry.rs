//! Name-indexed tool lookup with per-turn enablement.

use std::collections::HashMap;
use std::sync::Arc;

use super::tool::Tool;
use super::types::ToolDefinition;
use crate::agent::AgentSpec;
use crate::context::RunContext;
use crate::error::RociError;

/// Outcome of looking up a tool requested by the model.
#[derive(Clone)]
pub enum ToolResolution {
    Ready(Arc<dyn Tool>),
    /// Registered but its predicate rejected the current context.
    NotEnabled,
    NotFound,
}

impl std::fmt::Debug for ToolResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(tool) => f.debug_tuple("Ready").field(&tool.name()).finish(),
            Self::NotEnabled => f.write_str("NotEnabled"),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Registered tools in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate names.
    pub fn from_tools<I>(tools: I) -> Result<Self, RociError>
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RociError> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RociError::Configuration(format!(
                "duplicate tool name '{name}'"
            )));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up `name` and check its predicate against the current turn.
    pub fn resolve(&self, name: &str, ctx: &RunContext, agent: &AgentSpec) -> ToolResolution {
        match self.get(name) {
            Some(tool) if tool.is_enabled(ctx, agent) => ToolResolution::Ready(Arc::clone(tool)),
            Some(_) => ToolResolution::NotEnabled,
            None => ToolResolution::NotFound,
        }
    }

    /// Definitions of the tools enabled for this turn.
    pub fn enabled_definitions(&self, ctx: &RunContext, agent: &AgentSpec) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|tool| tool.is_enabled(ctx, agent))
            .map(|tool| tool.definition())
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Names that occur more than once in `names`, in first-seen order.
pub fn duplicate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashMap::new();
    let mut dupes = Vec::new();
    for name in names {
        let count = seen.entry(name).or_insert(0usize);
        *count += 1;
        if *count == 2 {
            dupes.push(name.to_string());
        }
    }
    dupes
}
