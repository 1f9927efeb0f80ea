use super::*;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::agent::{AgentSpec, Handoff, ModelSettings, OutputContract, ToolChoice, ToolUseBehavior};
use crate::context::RunContext;
use crate::error::RociError;
use crate::guardrail::{GuardrailVerdict, InputGuardrail, OutputGuardrail};
use crate::hooks::{Hooks, LifecycleEvent};
use crate::provider::ModelResponse;
use crate::session::Session;
use crate::tools::{AgentTool, AgentToolParameters};
use crate::types::{AgentToolCall, HandoffSignal, ModelMessage, Role, Usage};

mod support;

mod streaming;

use support::{add_tool, call, correlation, hook_log, test_runner};
