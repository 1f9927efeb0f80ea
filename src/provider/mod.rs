//! Model provider seam used by the run loop.
//!
//! Concrete HTTP clients live outside this crate; anything that can turn a
//! [`ModelRequest`] into a [`ModelResponse`] can drive a run.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::agent::ToolChoice;
use crate::error::RociError;
use crate::types::{AgentToolCall, HandoffSignal, ModelMessage, Usage};

pub use crate::tools::ToolDefinition;

/// A request for one model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Agent on whose behalf the model is called.
    pub agent_name: String,
    /// Model reference from the agent, if any.
    pub model: Option<String>,
    /// Resolved system instructions. Empty when the agent has none.
    pub instructions: String,
    pub messages: Vec<ModelMessage>,
    /// Function tools followed by hand-off tools.
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    /// JSON schema the final message must satisfy.
    pub output_schema: Option<serde_json::Value>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ModelRequest {
    /// Last user message text, if any.
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::types::Role::User)
            .map(ModelMessage::text)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Response from a model invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<AgentToolCall>,
    /// Explicit request to transfer control.
    #[serde(default)]
    pub handoff: Option<HandoffSignal>,
    #[serde(default)]
    pub usage: Usage,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn tool_calls(calls: Vec<AgentToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::default()
        }
    }

    pub fn handoff(signal: HandoffSignal) -> Self {
        Self {
            handoff: Some(signal),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// Incremental output of a streaming model call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelDelta {
    Text(String),
    /// The full response; always the last item of a successful stream.
    Completed(ModelResponse),
}

/// Core trait implemented by model backends.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name used in logs and errors.
    fn provider_name(&self) -> &str;

    /// Generate a complete response.
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, RociError>;

    /// Stream a response.
    ///
    /// The default wraps [`generate`](Self::generate): one text delta with the
    /// full text (when non-empty), then the completed response.
    async fn stream(
        &self,
        request: &ModelRequest,
    ) -> Result<BoxStream<'static, Result<ModelDelta, RociError>>, RociError> {
        let response = self.generate(request).await?;
        Ok(Box::pin(async_stream::stream! {
            if !response.text.is_empty() {
                yield Ok(ModelDelta::Text(response.text.clone()));
            }
            yield Ok(ModelDelta::Completed(response));
        }))
    }
}
