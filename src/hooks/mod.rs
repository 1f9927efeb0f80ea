//! Lifecycle hooks: a fixed set of run events delivered to listeners.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::RunContext;

/// Lifecycle events dispatched during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// An agent became active and is about to be invoked.
    AgentStart { agent: String },
    /// An agent produced the final output of the run.
    AgentEnd {
        agent: String,
        output: serde_json::Value,
    },
    ToolStart {
        agent: String,
        tool: String,
        call_id: String,
    },
    ToolEnd {
        agent: String,
        tool: String,
        call_id: String,
        result: serde_json::Value,
        is_error: bool,
    },
    Handoff { from: String, to: String },
}

impl LifecycleEvent {
    /// Agent the event is attributed to.
    ///
    /// For hand-offs this is the receiving agent.
    pub fn agent(&self) -> &str {
        match self {
            Self::AgentStart { agent }
            | Self::AgentEnd { agent, .. }
            | Self::ToolStart { agent, .. }
            | Self::ToolEnd { agent, .. } => agent,
            Self::Handoff { to, .. } => to,
        }
    }
}

/// Callback receiving lifecycle events.
pub type HookListener = Arc<dyn Fn(&RunContext, &LifecycleEvent) + Send + Sync>;

/// Ordered set of lifecycle listeners.
#[derive(Clone, Default)]
pub struct Hooks {
    listeners: Vec<HookListener>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; listeners are called in registration order.
    pub fn on<F>(mut self, listener: F) -> Self
    where
        F: Fn(&RunContext, &LifecycleEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn dispatch(&self, ctx: &RunContext, event: &LifecycleEvent) {
        for listener in &self.listeners {
            listener(ctx, event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
