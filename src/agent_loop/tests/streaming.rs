use super::*;

use pretty_assertions::assert_eq;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::support::{PendingProvider, RequestLog, ScriptedProvider};

fn label(event: &RunStreamEvent) -> String {
    match event {
        RunStreamEvent::AgentUpdated { agent } => format!("agent:{agent}"),
        RunStreamEvent::TurnStarted { turn, .. } => format!("turn:{turn}"),
        RunStreamEvent::TextDelta { text, .. } => format!("delta:{text}"),
        RunStreamEvent::ToolStarted { call, .. } => format!("tool_started:{}", call.id),
        RunStreamEvent::ToolEnded { record, .. } => format!("tool_ended:{}", record.call_id),
        RunStreamEvent::Handoff { from, to } => format!("handoff:{from}->{to}"),
        RunStreamEvent::MessageAppended { message } => format!("message:{:?}", message.role),
        RunStreamEvent::Completed(_) => "completed".to_string(),
        RunStreamEvent::Failed(err) => format!("failed:{}", err.category()),
    }
}

#[tokio::test]
async fn streamed_run_emits_deltas_then_completes() {
    let requests = RequestLog::default();
    let provider = ScriptedProvider::new(
        vec![
            ModelResponse::tool_calls(vec![call("c1", "add", json!({"a": 2, "b": 2}))]),
            ModelResponse::text("the sum is 4"),
        ],
        Arc::clone(&requests),
    )
    .chunked();
    let runner = Runner::new(Arc::new(provider));
    let agent = Arc::new(AgentSpec::new("Math").with_tool(add_tool()));

    let events: Vec<RunStreamEvent> = runner
        .run_streamed(&agent, "2 + 2", RunOptions::new())
        .collect()
        .await;

    let labels: Vec<String> = events.iter().map(label).collect();
    assert_eq!(
        labels,
        vec![
            "agent:Math",
            "turn:1",
            "message:Assistant",
            "tool_started:c1",
            "tool_ended:c1",
            "message:Tool",
            "turn:2",
            "delta:the ",
            "delta:sum ",
            "delta:is ",
            "delta:4",
            "message:Assistant",
            "completed",
        ]
    );
    match events.last() {
        Some(RunStreamEvent::Completed(result)) => {
            assert_eq!(result.final_output_text(), "the sum is 4");
            assert_eq!(result.turns, 2);
        }
        other => panic!("unexpected terminal event: {other:?}"),
    }
}

#[tokio::test]
async fn streamed_failure_ends_with_the_same_error() {
    let (runner, _requests) = test_runner(vec![ModelResponse::handoff(HandoffSignal::new("Nobody"))]);
    let agent = Arc::new(AgentSpec::new("Triage"));

    let stream = runner.run_streamed(&agent, "hi", RunOptions::new());
    let err = stream.into_result().await.unwrap_err();

    assert!(matches!(err, RociError::UnknownHandoffTarget { .. }));
}

#[tokio::test]
async fn streamed_handoff_is_announced() {
    let (runner, _requests) = test_runner(vec![
        ModelResponse::tool_calls(vec![call("c1", "transfer_to_billing", json!({}))]),
        ModelResponse::text("invoice sent"),
    ]);
    let agent = Arc::new(AgentSpec::new("Triage").with_handoff(AgentSpec::new("Billing")));

    let labels: Vec<String> = runner
        .run_streamed(&agent, "refund", RunOptions::new())
        .map(|event| label(&event))
        .collect()
        .await;

    let handoff = labels.iter().position(|l| l == "handoff:Triage->Billing").unwrap();
    let billing = labels.iter().position(|l| l == "agent:Billing").unwrap();
    assert!(handoff < billing);
    assert_eq!(labels.last().map(String::as_str), Some("completed"));
}

#[tokio::test]
async fn cancellation_fails_the_run_and_leaves_the_session_untouched() {
    let session = Session::in_memory("cancel-me");
    let runner = Runner::new(Arc::new(PendingProvider::default()));
    let agent = Arc::new(AgentSpec::new("Slow"));
    let cancel = CancellationToken::new();

    let run = {
        let runner = runner.clone();
        let agent = Arc::clone(&agent);
        let options = RunOptions::new()
            .with_session(session.clone())
            .with_cancel(cancel.clone());
        tokio::spawn(async move { runner.run(&agent, "take your time", options).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let err = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("run did not observe cancellation")
        .unwrap()
        .unwrap_err();

    match err {
        RociError::Canceled { diagnostics } => {
            assert_eq!(diagnostics.turns, 1);
            assert_eq!(diagnostics.history.len(), 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(session.get_items(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn run_stream_cancel_ends_with_failed_event() {
    let runner = Runner::new(Arc::new(PendingProvider::default()));
    let agent = Arc::new(AgentSpec::new("Slow"));

    let mut stream = runner.run_streamed(&agent, "wait", RunOptions::new());
    loop {
        match stream.next().await {
            Some(RunStreamEvent::TurnStarted { .. }) => break,
            Some(_) => continue,
            None => panic!("stream ended early"),
        }
    }
    stream.cancel();

    let terminal = tokio::time::timeout(Duration::from_secs(2), stream.into_result())
        .await
        .expect("stream did not end");
    assert!(matches!(terminal, Err(RociError::Canceled { .. })));
}

#[tokio::test]
async fn dropping_the_stream_cancels_the_run_but_not_the_callers_token() {
    let provider = PendingProvider::default();
    let in_flight = provider.in_flight();
    let runner = Runner::new(Arc::new(provider));
    let agent = Arc::new(AgentSpec::new("Slow"));
    let caller_token = CancellationToken::new();
    // the provider and this test each hold one reference while idle
    let idle = Arc::strong_count(&in_flight);

    let stream = runner.run_streamed(
        &agent,
        "wait",
        RunOptions::new().with_cancel(caller_token.clone()),
    );
    tokio::time::timeout(Duration::from_secs(2), async {
        while Arc::strong_count(&in_flight) <= idle {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("model call never started");

    drop(stream);

    tokio::time::timeout(Duration::from_secs(2), async {
        while Arc::strong_count(&in_flight) > idle {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("run kept waiting on the model after the stream was dropped");
    assert!(!caller_token.is_cancelled());
}
