//! Core types for roci-agents.

pub mod message;
pub mod usage;

pub use message::*;
pub use usage::*;
