//! roci-agents: multi-agent run loop for Roci
//!
//! Agents bundle instructions, function tools, hand-off targets, guardrails
//! and lifecycle hooks. A [`Runner`](agent_loop::Runner) drives one agent run
//! against any [`ModelProvider`](provider::ModelProvider): it calls the model,
//! executes requested tools, follows hand-offs and stops at a final output,
//! a tripped guardrail or the turn budget.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use roci_agents::prelude::*;
//! use serde_json::json;
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl ModelProvider for Echo {
//!     fn provider_name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
//!         Ok(ModelResponse::text(request.last_user_text().unwrap_or_default()))
//!     }
//! }
//!
//! # async fn example() -> roci_agents::error::Result<()> {
//! let weather = AgentTool::new(
//!     "get_weather",
//!     "Current weather for a city",
//!     AgentToolParameters::object()
//!         .string("city", "City name", true)
//!         .build(),
//!     |args, _ctx| async move {
//!         let city = args.get_str("city")?;
//!         Ok(json!({ "city": city, "forecast": "sunny" }))
//!     },
//! );
//! let agent = Arc::new(
//!     AgentSpec::new("Assistant")
//!         .with_instructions("You are a helpful assistant.")
//!         .with_tool(weather),
//! );
//!
//! let runner = Runner::new(Arc::new(Echo));
//! let result = runner.run(&agent, "Weather in Tokyo?", RunOptions::new()).await?;
//! println!("{}", result.final_output_text());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod context;
pub mod error;
pub mod guardrail;
pub mod hooks;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod tools;
pub mod types;
pub mod util;
