//! Runner driving one agent run from input to final output.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::events::{EventSink, RunStream, RunStreamEvent};
use super::limits::RunLimits;
use super::tooling::{handoff_record, result_message, skipped_record, ToolBatch};
use super::types::{RunInput, RunOptions, RunResult, ToolCallRecord};
use crate::agent::{AgentSpec, FunctionToolResult, Handoff, ToolChoice};
use crate::config::RunnerConfig;
use crate::error::{RociError, RunDiagnostics};
use crate::guardrail::{evaluate_input, evaluate_output, GuardrailResult, InputGuardrail, OutputGuardrail};
use crate::hooks::LifecycleEvent;
use crate::provider::{ModelDelta, ModelProvider, ModelRequest, ModelResponse};
use crate::tools::ToolRegistry;
use crate::types::{AgentToolCall, ContentPart, ModelMessage, Usage};

/// Executes agent runs against a model provider.
///
/// Cheap to clone; clones share the provider.
#[derive(Clone)]
pub struct Runner {
    provider: Arc<dyn ModelProvider>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            config: RunnerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        &self.provider
    }

    /// Run `agent` on `input` until it produces a final output.
    pub async fn run(
        &self,
        agent: &Arc<AgentSpec>,
        input: impl Into<RunInput>,
        options: RunOptions,
    ) -> Result<RunResult, RociError> {
        let events = EventSink::none();
        self.drive(Arc::clone(agent), input.into(), options, &events)
            .await
    }

    /// Run `agent` in the background and stream its events.
    ///
    /// The stream ends with `Completed` or `Failed` carrying the same outcome
    /// [`run`](Self::run) would have returned. Dropping the stream cancels
    /// the run.
    pub fn run_streamed(
        &self,
        agent: &Arc<AgentSpec>,
        input: impl Into<RunInput>,
        options: RunOptions,
    ) -> RunStream {
        let (events, rx) = EventSink::channel();
        let cancel = options.cancel.clone().unwrap_or_default().child_token();
        let options = options.with_cancel(cancel.clone());
        let runner = self.clone();
        let agent = Arc::clone(agent);
        let input = input.into();

        tokio::spawn(async move {
            let outcome = runner.drive(agent, input, options, &events).await;
            events.emit(match outcome {
                Ok(result) => RunStreamEvent::Completed(Box::new(result)),
                Err(err) => RunStreamEvent::Failed(err),
            });
        });

        RunStream::new(rx, cancel)
    }

    async fn drive(
        &self,
        agent: Arc<AgentSpec>,
        input: RunInput,
        options: RunOptions,
        events: &EventSink,
    ) -> Result<RunResult, RociError> {
        agent.validate()?;
        let span = tracing::info_span!(
            "agent_run",
            run_id = %options.context.run_id(),
            agent = %agent.name
        );

        async move {
            let run = RunLoop::start(self, agent, input, options, events).await?;
            run.execute().await
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("provider", &self.provider.provider_name())
            .field("config", &self.config)
            .finish()
    }
}

/// Next state of the loop.
enum Step {
    AwaitModel,
    Responded(ModelResponse),
    ExecuteTools(Vec<AgentToolCall>),
    HandOff(PendingHandoff),
    Finalize(Value),
}

struct PendingHandoff {
    handoff: Handoff,
    /// Tool call that requested the hand-off, when it came as one.
    trigger: Option<AgentToolCall>,
    /// Other calls of the same response; never executed.
    skipped: Vec<AgentToolCall>,
    payload: Value,
}

/// Last output contract failure, surfaced if the turn budget runs out.
struct ContractViolation {
    contract: String,
    message: String,
}

/// Mutable state of one run.
struct RunLoop<'a> {
    runner: &'a Runner,
    events: &'a EventSink,
    options: RunOptions,
    limits: RunLimits,
    cancel: CancellationToken,
    agent: Arc<AgentSpec>,
    registry: ToolRegistry,
    input: Vec<ModelMessage>,
    history: Vec<ModelMessage>,
    new_items: Vec<ModelMessage>,
    turns: usize,
    steps: usize,
    usage: Usage,
    tool_calls: Vec<ToolCallRecord>,
    input_guardrail_results: Vec<GuardrailResult>,
    tool_choice_override: Option<ToolChoice>,
    agent_started: bool,
    violation: Option<ContractViolation>,
}

impl<'a> RunLoop<'a> {
    async fn start(
        runner: &'a Runner,
        agent: Arc<AgentSpec>,
        input: RunInput,
        options: RunOptions,
        events: &'a EventSink,
    ) -> Result<Self, RociError> {
        let limits = RunLimits::resolve(&runner.config, &options);
        let cancel = options.cancel.clone().unwrap_or_default();
        let registry = agent.tool_registry()?;
        let input = input.into_messages();

        let mut history = match &options.session {
            Some(session) => session.get_items(None).await?,
            None => Vec::new(),
        };
        history.extend(input.iter().cloned());

        tracing::info!(
            max_turns = limits.max_turns,
            session = options.session.as_ref().map(|s| s.id()),
            "agent run started"
        );

        Ok(Self {
            runner,
            events,
            options,
            limits,
            cancel,
            agent,
            registry,
            input,
            history,
            new_items: Vec::new(),
            turns: 0,
            steps: 0,
            usage: Usage::default(),
            tool_calls: Vec::new(),
            input_guardrail_results: Vec::new(),
            tool_choice_override: None,
            agent_started: false,
            violation: None,
        })
    }

    async fn execute(mut self) -> Result<RunResult, RociError> {
        self.check_input().await?;

        let mut step = Step::AwaitModel;
        loop {
            if self.cancel.is_cancelled() {
                return Err(self.canceled());
            }
            step = match step {
                Step::AwaitModel => self.await_model().await?,
                Step::Responded(response) => self.classify(response)?,
                Step::ExecuteTools(calls) => self.execute_tools(calls).await?,
                Step::HandOff(pending) => self.hand_off(pending)?,
                Step::Finalize(output) => return self.finish(output).await,
            };
        }
    }

    /// Input guardrails of the starting agent plus the run-level ones.
    async fn check_input(&mut self) -> Result<(), RociError> {
        let guardrails: Vec<&InputGuardrail> = self
            .agent
            .input_guardrails
            .iter()
            .chain(self.options.input_guardrails.iter())
            .collect();
        if guardrails.is_empty() {
            return Ok(());
        }

        let input: Arc<[ModelMessage]> = self.input.clone().into();
        let results = tokio::select! {
            _ = self.cancel.cancelled() => return Err(self.canceled()),
            results = evaluate_input(&guardrails, &self.options.context, &self.agent, &input) => results?,
        };

        if let Some(tripped) = results.iter().find(|r| r.tripped()) {
            tracing::warn!(guardrail = %tripped.guardrail, "input guardrail tripped");
            return Err(RociError::InputRejected {
                guardrail: tripped.guardrail.clone(),
                output_info: tripped.verdict.output_info.clone(),
                diagnostics: self.diagnostics(),
            });
        }
        self.input_guardrail_results = results;
        Ok(())
    }

    async fn await_model(&mut self) -> Result<Step, RociError> {
        if self.turns >= self.limits.max_turns {
            return Err(match self.violation.take() {
                Some(violation) => RociError::OutputContractViolation {
                    agent: self.agent.name.clone(),
                    contract: violation.contract,
                    message: violation.message,
                    diagnostics: self.diagnostics(),
                },
                None => RociError::MaxTurnsExceeded {
                    max_turns: self.limits.max_turns,
                    diagnostics: self.diagnostics(),
                },
            });
        }

        if !self.agent_started {
            self.agent_started = true;
            self.dispatch(&LifecycleEvent::AgentStart {
                agent: self.agent.name.clone(),
            });
            self.events.emit(RunStreamEvent::AgentUpdated {
                agent: self.agent.name.clone(),
            });
        }

        self.turns += 1;
        self.steps += 1;
        tracing::debug!(agent = %self.agent.name, turn = self.turns, "model turn");
        self.events.emit(RunStreamEvent::TurnStarted {
            agent: self.agent.name.clone(),
            turn: self.turns,
        });

        let request = self.build_request();
        let response = self.call_model(&request).await?;
        Ok(Step::Responded(response))
    }

    fn build_request(&self) -> ModelRequest {
        let context = &self.options.context;
        let settings = &self.agent.model_settings;
        let mut tools = self.registry.enabled_definitions(context, &self.agent);
        tools.extend(self.agent.handoff_definitions());

        ModelRequest {
            agent_name: self.agent.name.clone(),
            model: self.agent.model.clone(),
            instructions: self.agent.resolve_instructions(context),
            messages: self.history.clone(),
            tools,
            tool_choice: self
                .tool_choice_override
                .clone()
                .unwrap_or_else(|| settings.tool_choice.clone()),
            output_schema: self
                .agent
                .output_contract
                .as_ref()
                .map(|contract| contract.schema().clone()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    /// One model invocation, retried on retryable errors and raced against
    /// cancellation.
    async fn call_model(&self, request: &ModelRequest) -> Result<ModelResponse, RociError> {
        let provider = self
            .agent
            .provider
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.runner.provider));
        let policy = self.runner.config.model_retry.policy();

        let call = async {
            if !self.events.is_streaming() {
                return policy.execute(|| provider.generate(request)).await;
            }

            // Only opening the stream is retried; forwarded deltas cannot be taken back.
            let mut stream = policy.execute(|| provider.stream(request)).await?;
            while let Some(delta) = stream.next().await {
                match delta? {
                    ModelDelta::Text(text) => self.events.emit(RunStreamEvent::TextDelta {
                        agent: self.agent.name.clone(),
                        text,
                    }),
                    ModelDelta::Completed(response) => return Ok(response),
                }
            }
            Err(RociError::Stream(format!(
                "provider '{}' ended the stream without a response",
                provider.provider_name()
            )))
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(self.canceled()),
            outcome = call => outcome,
        }
    }

    fn classify(&mut self, response: ModelResponse) -> Result<Step, RociError> {
        self.usage.merge(&response.usage);

        let mut message = ModelMessage::assistant_tool_calls(response.text.clone(), &response.tool_calls);
        if let Some(signal) = &response.handoff {
            message.content.push(ContentPart::Handoff(signal.clone()));
        }
        self.append(message.from_agent(self.agent.name.clone()));

        let ModelResponse {
            text,
            mut tool_calls,
            handoff,
            ..
        } = response;

        if let Some(signal) = handoff {
            let Some(handoff) = self.agent.find_handoff(&signal.target).cloned() else {
                tracing::warn!(agent = %self.agent.name, target = %signal.target, "unknown hand-off target");
                return Err(RociError::UnknownHandoffTarget {
                    agent: self.agent.name.clone(),
                    target: signal.target,
                    diagnostics: self.diagnostics(),
                });
            };
            return Ok(Step::HandOff(PendingHandoff {
                handoff,
                trigger: None,
                skipped: tool_calls,
                payload: signal.payload,
            }));
        }

        let requested = tool_calls
            .iter()
            .position(|call| self.agent.handoff_for_tool(&call.name).is_some());
        if let Some(position) = requested {
            let trigger = tool_calls.remove(position);
            if let Some(handoff) = self.agent.handoff_for_tool(&trigger.name).cloned() {
                let payload = trigger.arguments.clone();
                return Ok(Step::HandOff(PendingHandoff {
                    handoff,
                    trigger: Some(trigger),
                    skipped: tool_calls,
                    payload,
                }));
            }
        }

        if !tool_calls.is_empty() {
            return Ok(Step::ExecuteTools(tool_calls));
        }

        let Some(contract) = &self.agent.output_contract else {
            return Ok(Step::Finalize(Value::String(text)));
        };
        match contract.validate(&text) {
            Ok(value) => {
                self.violation = None;
                Ok(Step::Finalize(value))
            }
            Err(message) => {
                tracing::warn!(
                    agent = %self.agent.name,
                    contract = %contract.name(),
                    error = %message,
                    "final output violates contract"
                );
                let reprompt = ModelMessage::user(format!(
                    "Your previous answer does not satisfy the output contract '{}': {message}. \
                     Reply again with JSON matching the schema.",
                    contract.name()
                ));
                self.violation = Some(ContractViolation {
                    contract: contract.name().to_string(),
                    message,
                });
                self.append(reprompt);
                Ok(Step::AwaitModel)
            }
        }
    }

    async fn execute_tools(&mut self, calls: Vec<AgentToolCall>) -> Result<Step, RociError> {
        let batch = ToolBatch {
            registry: &self.registry,
            agent: &self.agent,
            context: &self.options.context,
            run_hooks: &self.options.hooks,
            events: self.events,
            max_concurrency: self.limits.max_tool_concurrency,
            timeout: self.limits.tool_timeout,
        };
        let records = tokio::select! {
            _ = self.cancel.cancelled() => return Err(self.canceled()),
            records = batch.execute(&calls) => records,
        };
        self.steps += 1;

        let results: Vec<FunctionToolResult> = records
            .iter()
            .map(|record| FunctionToolResult {
                tool_name: record.tool_name.clone(),
                call_id: record.call_id.clone(),
                output: record.result.clone(),
                is_error: record.status.is_error(),
            })
            .collect();
        for record in records {
            self.append(result_message(&record));
            self.tool_calls.push(record);
        }

        let settings = &self.agent.model_settings;
        if settings.reset_tool_choice && settings.tool_choice.forces_tool_use() {
            self.tool_choice_override = Some(ToolChoice::Auto);
        }

        Ok(
            match self
                .agent
                .tool_use_behavior
                .final_output(&self.options.context, &results)
            {
                Some(output) => Step::Finalize(output),
                None => Step::AwaitModel,
            },
        )
    }

    fn hand_off(&mut self, pending: PendingHandoff) -> Result<Step, RociError> {
        let from = self.agent.name.clone();
        let target = Arc::clone(pending.handoff.target());
        let to = target.name.clone();

        if let Some(trigger) = &pending.trigger {
            self.record_unexecuted(handoff_record(&from, trigger, &to));
        }
        for call in &pending.skipped {
            self.record_unexecuted(skipped_record(&from, call, &to));
        }

        let context = &self.options.context;
        pending.handoff.notify(context, &pending.payload);
        let event = LifecycleEvent::Handoff {
            from: from.clone(),
            to: to.clone(),
        };
        self.options.hooks.dispatch(context, &event);
        target.hooks.dispatch(context, &event);
        self.events.emit(RunStreamEvent::Handoff {
            from: from.clone(),
            to: to.clone(),
        });
        tracing::info!(from = %from, to = %to, turn = self.turns, "agent hand-off");

        self.registry = target.tool_registry()?;
        self.agent = target;
        self.tool_choice_override = None;
        self.agent_started = false;
        self.violation = None;
        Ok(Step::AwaitModel)
    }

    /// Output guardrails, then the session write and the result.
    async fn finish(self, output: Value) -> Result<RunResult, RociError> {
        let guardrails: Vec<&OutputGuardrail> = self
            .agent
            .output_guardrails
            .iter()
            .chain(self.options.output_guardrails.iter())
            .collect();
        let output = Arc::new(output);
        let output_guardrail_results = if guardrails.is_empty() {
            Vec::new()
        } else {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(self.canceled()),
                results = evaluate_output(&guardrails, &self.options.context, &self.agent, &output) => results?,
            }
        };

        if let Some(tripped) = output_guardrail_results.iter().find(|r| r.tripped()) {
            tracing::warn!(guardrail = %tripped.guardrail, agent = %self.agent.name, "output guardrail tripped");
            return Err(RociError::OutputRejected {
                guardrail: tripped.guardrail.clone(),
                output_info: tripped.verdict.output_info.clone(),
                output: output.as_ref().clone(),
                diagnostics: self.diagnostics(),
            });
        }

        let final_output = output.as_ref().clone();
        self.dispatch(&LifecycleEvent::AgentEnd {
            agent: self.agent.name.clone(),
            output: final_output.clone(),
        });

        if let Some(session) = &self.options.session {
            let mut items = self.input.clone();
            items.extend(self.new_items.iter().cloned());
            session.add_items(&items).await?;
        }

        tracing::info!(
            last_agent = %self.agent.name,
            turns = self.turns,
            steps = self.steps,
            tool_calls = self.tool_calls.len(),
            "agent run completed"
        );

        Ok(RunResult {
            final_output,
            last_agent: self.agent,
            input: self.input,
            history: self.history,
            new_items: self.new_items,
            turns: self.turns,
            steps: self.steps,
            usage: self.usage,
            tool_calls: self.tool_calls,
            input_guardrail_results: self.input_guardrail_results,
            output_guardrail_results,
        })
    }

    fn record_unexecuted(&mut self, record: ToolCallRecord) {
        self.append(result_message(&record));
        self.tool_calls.push(record);
    }

    fn append(&mut self, message: ModelMessage) {
        self.events.emit(RunStreamEvent::MessageAppended {
            message: message.clone(),
        });
        self.history.push(message.clone());
        self.new_items.push(message);
    }

    /// Run-level listeners first, then the active agent's.
    fn dispatch(&self, event: &LifecycleEvent) {
        self.options.hooks.dispatch(&self.options.context, event);
        self.agent.hooks.dispatch(&self.options.context, event);
    }

    fn diagnostics(&self) -> Box<RunDiagnostics> {
        Box::new(RunDiagnostics::new(
            self.agent.name.clone(),
            self.turns,
            self.history.clone(),
        ))
    }

    fn canceled(&self) -> RociError {
        tracing::debug!(agent = %self.agent.name, turn = self.turns, "agent run canceled");
        RociError::Canceled {
            diagnostics: self.diagnostics(),
        }
    }
}
