//! Shared test helpers and mock provider.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;

use roci_agents::error::RociError;
use roci_agents::provider::{ModelProvider, ModelRequest, ModelResponse};
use roci_agents::types::*;

/// A mock provider that returns canned responses in order and records every
/// request it receives.
pub struct MockProvider {
    responses: Mutex<Vec<ModelResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text response.
    pub fn queue_response(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push(ModelResponse::text(text).with_usage(Usage::new(10, 20)));
    }

    /// Queue a tool call response.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) {
        self.responses.lock().unwrap().push(
            ModelResponse::tool_calls(vec![AgentToolCall::new(id, name, args)])
                .with_usage(Usage::new(10, 5)),
        );
    }

    /// Queue an explicit hand-off signal.
    pub fn queue_handoff(&self, target: &str) {
        self.responses
            .lock()
            .unwrap()
            .push(ModelResponse::handoff(HandoffSignal::new(target)));
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, RociError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(ModelResponse::text("Mock response"));
        }
        Ok(responses.remove(0))
    }
}
