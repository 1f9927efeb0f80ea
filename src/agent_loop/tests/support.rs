use super::*;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::provider::{ModelDelta, ModelProvider, ModelRequest, ModelResponse};

pub(super) type RequestLog = Arc<Mutex<Vec<ModelRequest>>>;

/// Replays queued responses in order; the last one repeats once the queue
/// drains. Every request is recorded.
pub(super) struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ModelResponse, RociError>>>,
    last: Mutex<Option<ModelResponse>>,
    requests: RequestLog,
    chunked: bool,
}

impl ScriptedProvider {
    pub(super) fn new(responses: Vec<ModelResponse>, requests: RequestLog) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            last: Mutex::new(None),
            requests,
            chunked: false,
        }
    }

    pub(super) fn with_results(
        results: Vec<Result<ModelResponse, RociError>>,
        requests: RequestLog,
    ) -> Self {
        Self {
            responses: Mutex::new(results.into_iter().collect()),
            last: Mutex::new(None),
            requests,
            chunked: false,
        }
    }

    /// Stream text word by word instead of in one delta.
    pub(super) fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    fn next(&self, request: &ModelRequest) -> Result<ModelResponse, RociError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => {
                *self.last.lock().unwrap() = Some(response.clone());
                Ok(response)
            }
            Some(Err(err)) => Err(err),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| RociError::provider("scripted", "script is empty")),
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, RociError> {
        self.next(request)
    }

    async fn stream(
        &self,
        request: &ModelRequest,
    ) -> Result<BoxStream<'static, Result<ModelDelta, RociError>>, RociError> {
        let response = self.next(request)?;
        let chunks: Vec<String> = if self.chunked {
            response
                .text
                .split_inclusive(' ')
                .map(str::to_string)
                .collect()
        } else if response.text.is_empty() {
            Vec::new()
        } else {
            vec![response.text.clone()]
        };
        Ok(Box::pin(async_stream::stream! {
            for chunk in chunks {
                yield Ok(ModelDelta::Text(chunk));
            }
            yield Ok(ModelDelta::Completed(response));
        }))
    }
}

/// Provider that never answers; used to hold a run at a suspend point.
/// Never answers. Each in-flight call holds a clone of `in_flight`.
#[derive(Default)]
pub(super) struct PendingProvider {
    in_flight: Arc<()>,
}

impl PendingProvider {
    pub(super) fn in_flight(&self) -> Arc<()> {
        Arc::clone(&self.in_flight)
    }
}

#[async_trait]
impl ModelProvider for PendingProvider {
    fn provider_name(&self) -> &str {
        "pending"
    }

    async fn generate(&self, _request: &ModelRequest) -> Result<ModelResponse, RociError> {
        let _held = Arc::clone(&self.in_flight);
        futures::future::pending().await
    }
}

pub(super) fn test_runner(responses: Vec<ModelResponse>) -> (Runner, RequestLog) {
    let requests = RequestLog::default();
    let provider = ScriptedProvider::new(responses, Arc::clone(&requests));
    (Runner::new(Arc::new(provider)), requests)
}

pub(super) fn call(id: &str, name: &str, arguments: Value) -> AgentToolCall {
    AgentToolCall::new(id, name, arguments)
}

pub(super) fn add_tool() -> AgentTool {
    AgentTool::new(
        "add",
        "Add two integers",
        AgentToolParameters::object()
            .integer("a", "first operand", true)
            .integer("b", "second operand", true)
            .build(),
        |args, _ctx| async move {
            let sum = args.get_i64("a")? + args.get_i64("b")?;
            Ok(json!(sum))
        },
    )
}

/// Tool call ids in assistant messages and tool result ids, in history order.
pub(super) fn correlation(history: &[ModelMessage]) -> (Vec<String>, Vec<String>) {
    let requested = history
        .iter()
        .flat_map(|m| m.tool_calls())
        .map(|c| c.id.clone())
        .collect();
    let answered = history
        .iter()
        .flat_map(|m| m.tool_results())
        .map(|r| r.tool_call_id.clone())
        .collect();
    (requested, answered)
}

pub(super) fn hook_log() -> (Hooks, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let hooks = Hooks::new().on(move |_, event| {
        let label = match event {
            LifecycleEvent::AgentStart { agent } => format!("agent_start:{agent}"),
            LifecycleEvent::AgentEnd { agent, .. } => format!("agent_end:{agent}"),
            LifecycleEvent::ToolStart { tool, .. } => format!("tool_start:{tool}"),
            LifecycleEvent::ToolEnd { tool, .. } => format!("tool_end:{tool}"),
            LifecycleEvent::Handoff { from, to } => format!("handoff:{from}->{to}"),
        };
        sink.lock().unwrap().push(label);
    });
    (hooks, log)
}
