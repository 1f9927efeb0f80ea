use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{stream, StreamExt};
use serde_json::{json, Value};
use tracing::Instrument;

use super::events::{EventSink, RunStreamEvent};
use super::types::{ToolCallRecord, ToolCallStatus};
use crate::agent::AgentSpec;
use crate::context::RunContext;
use crate::error::RociError;
use crate::hooks::{Hooks, LifecycleEvent};
use crate::tools::{validate_arguments, ToolArguments, ToolExecutionContext, ToolRegistry, ToolResolution};
use crate::types::{AgentToolCall, ModelMessage};

/// Everything a batch of tool calls needs from the run.
pub(crate) struct ToolBatch<'a> {
    pub(crate) registry: &'a ToolRegistry,
    pub(crate) agent: &'a Arc<AgentSpec>,
    pub(crate) context: &'a RunContext,
    pub(crate) run_hooks: &'a Hooks,
    pub(crate) events: &'a EventSink,
    pub(crate) max_concurrency: Option<usize>,
    pub(crate) timeout: Option<Duration>,
}

impl ToolBatch<'_> {
    /// Execute `calls` concurrently; records come back in request order.
    pub(crate) async fn execute(&self, calls: &[AgentToolCall]) -> Vec<ToolCallRecord> {
        let limit = self.max_concurrency.unwrap_or(calls.len()).max(1);
        let pending: Vec<_> = calls.iter().map(|call| self.execute_one(call)).collect();
        stream::iter(pending)
            .buffered(limit)
            .collect()
            .await
    }

    async fn execute_one(&self, call: &AgentToolCall) -> ToolCallRecord {
        let started = Instant::now();
        let args = ToolArguments::new(call.arguments.clone());

        let tool = match self.registry.resolve(&call.name, self.context, self.agent) {
            ToolResolution::Ready(tool) => tool,
            ToolResolution::NotEnabled => {
                tracing::warn!(tool = %call.name, call_id = %call.id, "model called a disabled tool");
                return self.rejected(
                    call,
                    ToolCallStatus::NotEnabled,
                    format!("Tool '{}' is not enabled", call.name),
                    started,
                );
            }
            ToolResolution::NotFound => {
                tracing::warn!(tool = %call.name, call_id = %call.id, "model called an unknown tool");
                return self.rejected(
                    call,
                    ToolCallStatus::NotFound,
                    format!("Tool '{}' not found", call.name),
                    started,
                );
            }
        };

        if let Err(validation_error) = validate_arguments(args.raw(), &tool.parameters().schema) {
            tracing::warn!(tool = %call.name, call_id = %call.id, error = %validation_error, "invalid tool arguments");
            return self.rejected(
                call,
                ToolCallStatus::InvalidArguments,
                format!("Argument validation failed: {validation_error}"),
                started,
            );
        }

        self.dispatch(LifecycleEvent::ToolStart {
            agent: self.agent.name.clone(),
            tool: call.name.clone(),
            call_id: call.id.clone(),
        });
        self.events.emit(RunStreamEvent::ToolStarted {
            agent: self.agent.name.clone(),
            call: call.clone(),
        });

        let ctx = ToolExecutionContext {
            run_context: self.context.clone(),
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            agent_name: self.agent.name.clone(),
        };
        let span = tracing::info_span!("tool_call", tool = %call.name, call_id = %call.id);
        let outcome = crate::util::timeout::with_optional_timeout(self.timeout, tool.execute(&args, &ctx))
            .instrument(span)
            .await;

        let (status, result) = match outcome {
            Ok(value) => (ToolCallStatus::Completed, value),
            Err(RociError::Timeout(ms)) => (
                ToolCallStatus::TimedOut,
                json!({ "error": format!("Tool '{}' timed out after {ms}ms", call.name) }),
            ),
            Err(error) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %error, "tool failed");
                (ToolCallStatus::Failed, json!({ "error": error.to_string() }))
            }
        };
        let record = self.record(call, status, result, started);
        tracing::debug!(
            tool = %call.name,
            call_id = %call.id,
            status = %record.status,
            elapsed_ms = record.elapsed_ms,
            "tool call finished"
        );

        self.dispatch(LifecycleEvent::ToolEnd {
            agent: self.agent.name.clone(),
            tool: call.name.clone(),
            call_id: call.id.clone(),
            result: record.result.clone(),
            is_error: record.status.is_error(),
        });
        self.events.emit(RunStreamEvent::ToolEnded {
            agent: self.agent.name.clone(),
            record: record.clone(),
        });
        record
    }

    fn rejected(
        &self,
        call: &AgentToolCall,
        status: ToolCallStatus,
        error: String,
        started: Instant,
    ) -> ToolCallRecord {
        self.record(call, status, json!({ "error": error }), started)
    }

    fn record(
        &self,
        call: &AgentToolCall,
        status: ToolCallStatus,
        result: Value,
        started: Instant,
    ) -> ToolCallRecord {
        ToolCallRecord {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            agent: self.agent.name.clone(),
            arguments: call.arguments.clone(),
            status,
            result,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn dispatch(&self, event: LifecycleEvent) {
        self.run_hooks.dispatch(self.context, &event);
        self.agent.hooks.dispatch(self.context, &event);
    }
}

/// Record for a call that was not executed because control moved elsewhere.
pub(crate) fn skipped_record(agent: &str, call: &AgentToolCall, target: &str) -> ToolCallRecord {
    ToolCallRecord {
        call_id: call.id.clone(),
        tool_name: call.name.clone(),
        agent: agent.to_string(),
        arguments: call.arguments.clone(),
        status: ToolCallStatus::Skipped,
        result: json!({ "error": format!("Skipped: control was handed off to '{target}'") }),
        elapsed_ms: 0,
    }
}

/// Record for the tool call that carried a hand-off.
pub(crate) fn handoff_record(agent: &str, call: &AgentToolCall, target: &str) -> ToolCallRecord {
    ToolCallRecord {
        call_id: call.id.clone(),
        tool_name: call.name.clone(),
        agent: agent.to_string(),
        arguments: call.arguments.clone(),
        status: ToolCallStatus::Completed,
        result: json!({ "assistant": target }),
        elapsed_ms: 0,
    }
}

/// Tool result message correlating with `record`.
pub(crate) fn result_message(record: &ToolCallRecord) -> ModelMessage {
    ModelMessage::tool_result(
        record.call_id.clone(),
        record.result.clone(),
        record.status.is_error(),
    )
    .from_agent(record.agent.clone())
}
