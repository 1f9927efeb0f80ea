//! Convenience re-exports for common use.

pub use crate::agent::{
    AgentAsTool, AgentSpec, Handoff, ModelSettings, OutputContract, ToolChoice, ToolUseBehavior,
};
pub use crate::agent_loop::{
    RunInput, RunOptions, RunResult, RunStream, RunStreamEvent, Runner, ToolCallStatus,
};
pub use crate::config::RunnerConfig;
pub use crate::context::RunContext;
pub use crate::error::{Result, RociError};
pub use crate::guardrail::{GuardrailVerdict, InputGuardrail, OutputGuardrail};
pub use crate::hooks::{Hooks, LifecycleEvent};
pub use crate::provider::{ModelDelta, ModelProvider, ModelRequest, ModelResponse};
pub use crate::session::{FileSessionStore, InMemorySessionStore, Session, SessionStore};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments};
pub use crate::types::{AgentToolCall, ContentPart, HandoffSignal, ModelMessage, Role, Usage};
