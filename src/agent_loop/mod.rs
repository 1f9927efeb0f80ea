//! Agent run loop: turns, tool batches, hand-offs and guardrails.

pub mod events;
mod limits;
pub mod runner;
mod tooling;
pub mod types;

#[cfg(test)]
mod tests;

pub use events::{RunStream, RunStreamEvent};
pub use runner::Runner;
pub use types::{RunInput, RunOptions, RunResult, ToolCallRecord, ToolCallStatus};
