//! Input and output guardrails.
//!
//! A guardrail inspects the run input (before the first model call) or the
//! candidate final output (before it is returned) and either passes or trips.
//! A tripped guardrail aborts the run. Guardrails are async closures, so a
//! guardrail may itself run a classifier agent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::AgentSpec;
use crate::context::RunContext;
use crate::error::RociError;
use crate::types::ModelMessage;

/// Result of evaluating one guardrail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub tripwire_triggered: bool,
    /// Diagnostic payload surfaced to the caller.
    #[serde(default)]
    pub output_info: Value,
}

impl GuardrailVerdict {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn trip(output_info: Value) -> Self {
        Self {
            tripwire_triggered: true,
            output_info,
        }
    }

    pub fn with_info(mut self, output_info: Value) -> Self {
        self.output_info = output_info;
        self
    }
}

/// A verdict paired with the guardrail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub guardrail: String,
    pub verdict: GuardrailVerdict,
}

impl GuardrailResult {
    pub fn tripped(&self) -> bool {
        self.verdict.tripwire_triggered
    }
}

type BoxedVerdict = Pin<Box<dyn Future<Output = Result<GuardrailVerdict, RociError>> + Send>>;

type InputCheck =
    dyn Fn(RunContext, Arc<AgentSpec>, Arc<[ModelMessage]>) -> BoxedVerdict + Send + Sync;

type OutputCheck = dyn Fn(RunContext, Arc<AgentSpec>, Arc<Value>) -> BoxedVerdict + Send + Sync;

/// Guardrail over the run input.
#[derive(Clone)]
pub struct InputGuardrail {
    name: String,
    check: Arc<InputCheck>,
}

impl InputGuardrail {
    pub fn new<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(RunContext, Arc<AgentSpec>, Arc<[ModelMessage]>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GuardrailVerdict, RociError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(move |ctx, agent, input| Box::pin(check(ctx, agent, input))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(
        &self,
        ctx: &RunContext,
        agent: &Arc<AgentSpec>,
        input: &Arc<[ModelMessage]>,
    ) -> Result<GuardrailResult, RociError> {
        let verdict = (self.check)(ctx.clone(), Arc::clone(agent), Arc::clone(input)).await?;
        Ok(GuardrailResult {
            guardrail: self.name.clone(),
            verdict,
        })
    }
}

/// Guardrail over the candidate final output.
#[derive(Clone)]
pub struct OutputGuardrail {
    name: String,
    check: Arc<OutputCheck>,
}

impl OutputGuardrail {
    pub fn new<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(RunContext, Arc<AgentSpec>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GuardrailVerdict, RociError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(move |ctx, agent, output| Box::pin(check(ctx, agent, output))),
        }
    }

    /// Trip when the rendered output matches `pattern`.
    ///
    /// String outputs are matched as-is; structured outputs are matched
    /// against their JSON encoding.
    pub fn deny_pattern(name: impl Into<String>, pattern: &str) -> Result<Self, RociError> {
        let regex = Regex::new(pattern).map_err(|e| {
            RociError::Configuration(format!("invalid guardrail pattern '{pattern}': {e}"))
        })?;
        Ok(Self::new(name, move |_, _, output: Arc<Value>| {
            let text = output_text(&output);
            let verdict = match regex.find(&text) {
                Some(m) => GuardrailVerdict::trip(json!({ "matched": m.as_str() })),
                None => GuardrailVerdict::pass(),
            };
            async move { Ok(verdict) }
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(
        &self,
        ctx: &RunContext,
        agent: &Arc<AgentSpec>,
        output: &Arc<Value>,
    ) -> Result<GuardrailResult, RociError> {
        let verdict = (self.check)(ctx.clone(), Arc::clone(agent), Arc::clone(output)).await?;
        Ok(GuardrailResult {
            guardrail: self.name.clone(),
            verdict,
        })
    }
}

impl std::fmt::Debug for InputGuardrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputGuardrail").field("name", &self.name).finish()
    }
}

impl std::fmt::Debug for OutputGuardrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputGuardrail").field("name", &self.name).finish()
    }
}

/// Evaluate input guardrails concurrently.
///
/// Without a trip, every verdict comes back in declaration order. The first
/// tripped verdict ends evaluation at once: the remaining guardrails are
/// dropped and the returned list ends with the tripped result. An evaluation
/// error is propagated only when nothing tripped.
pub async fn evaluate_input(
    guardrails: &[&InputGuardrail],
    ctx: &RunContext,
    agent: &Arc<AgentSpec>,
    input: &Arc<[ModelMessage]>,
) -> Result<Vec<GuardrailResult>, RociError> {
    let checks: Vec<_> = guardrails.iter().map(|g| g.run(ctx, agent, input)).collect();
    until_tripped(checks).await
}

/// Evaluate output guardrails concurrently, with the same trip semantics as
/// [`evaluate_input`].
pub async fn evaluate_output(
    guardrails: &[&OutputGuardrail],
    ctx: &RunContext,
    agent: &Arc<AgentSpec>,
    output: &Arc<Value>,
) -> Result<Vec<GuardrailResult>, RociError> {
    let checks: Vec<_> = guardrails.iter().map(|g| g.run(ctx, agent, output)).collect();
    until_tripped(checks).await
}

async fn until_tripped<F>(checks: Vec<F>) -> Result<Vec<GuardrailResult>, RociError>
where
    F: Future<Output = Result<GuardrailResult, RociError>>,
{
    let mut pending: FuturesUnordered<_> = checks
        .into_iter()
        .enumerate()
        .map(|(index, check)| async move { (index, check.await) })
        .collect();

    let mut passed: Vec<(usize, GuardrailResult)> = Vec::new();
    let mut failure: Option<RociError> = None;
    while let Some((index, outcome)) = pending.next().await {
        match outcome {
            Ok(result) if result.tripped() => {
                passed.sort_by_key(|(index, _)| *index);
                let mut results: Vec<GuardrailResult> = passed.into_iter().map(|(_, r)| r).collect();
                results.push(result);
                return Ok(results);
            }
            Ok(result) => passed.push((index, result)),
            Err(err) => {
                if failure.is_none() {
                    failure = Some(err);
                }
            }
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }
    passed.sort_by_key(|(index, _)| *index);
    Ok(passed.into_iter().map(|(_, result)| result).collect())
}

/// Concatenated text of the user messages in `input`.
pub fn input_text(input: &[ModelMessage]) -> String {
    input
        .iter()
        .filter(|m| m.role == crate::types::Role::User)
        .map(ModelMessage::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text form of a final output value.
pub fn output_text(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
