//! Tool system for function calling.

pub mod arguments;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::{ToolRegistry, ToolResolution};
pub use tool::{AgentTool, EnabledPredicate, Tool, ToolExecutionContext};
pub use types::{AgentToolParameters, ParameterBuilder, ToolDefinition};
pub use validation::validate_arguments;
