//! Agent definitions and the policies attached to them.

pub mod agent;
pub mod as_tool;
pub mod behavior;
pub mod handoff;
pub mod output;
pub mod settings;

pub use agent::{AgentSpec, InstructionFn, Instructions};
pub use as_tool::AgentAsTool;
pub use behavior::{FunctionToolResult, ToolUseBehavior, ToolsToFinalOutput, ToolsToFinalOutputResult};
pub use handoff::{default_tool_name, Handoff, OnHandoff};
pub use output::OutputContract;
pub use settings::{ModelSettings, ToolChoice};
