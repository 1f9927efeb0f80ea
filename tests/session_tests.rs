//! Tests for session stores and session-backed runs.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::MockProvider;
use roci_agents::config::RunnerConfig;
use roci_agents::prelude::*;

fn numbered(n: usize) -> Vec<ModelMessage> {
    (1..=n).map(|i| ModelMessage::user(format!("message {i}"))).collect()
}

fn texts(messages: &[ModelMessage]) -> Vec<String> {
    messages.iter().map(ModelMessage::text).collect()
}

#[tokio::test]
async fn limited_read_returns_most_recent_messages() {
    let dir = TempDir::new().unwrap();
    let stores: Vec<Arc<dyn SessionStore>> = vec![
        Arc::new(InMemorySessionStore::new()),
        Arc::new(FileSessionStore::new(dir.path())),
    ];

    for store in stores {
        store.append("conversation_123", &numbered(5)).await.unwrap();

        let last_two = store.read("conversation_123", Some(2)).await.unwrap();
        assert_eq!(texts(&last_two), vec!["message 4", "message 5"]);

        let all = store.read("conversation_123", None).await.unwrap();
        assert_eq!(texts(&all), texts(&numbered(5)));
    }
}

#[tokio::test]
async fn file_session_survives_a_new_store_instance() {
    let dir = TempDir::new().unwrap();
    let config = RunnerConfig::default().with_session_dir(dir.path());
    let provider = Arc::new(MockProvider::new());
    provider.queue_response("Hello Ada");
    provider.queue_response("You are Ada");
    let runner = Runner::new(provider.clone()).with_config(config.clone());
    let agent = Arc::new(AgentSpec::new("Assistant"));

    let first = Session::new("user_42", Arc::new(FileSessionStore::from_config(&config)));
    runner
        .run(&agent, "I am Ada", RunOptions::new().with_session(first))
        .await
        .unwrap();

    let reopened = Session::new("user_42", Arc::new(FileSessionStore::from_config(&config)));
    runner
        .run(&agent, "Who am I?", RunOptions::new().with_session(reopened.clone()))
        .await
        .unwrap();

    assert_eq!(
        texts(&provider.requests()[1].messages),
        vec!["I am Ada", "Hello Ada", "Who am I?"]
    );
    assert_eq!(reopened.get_items(None).await.unwrap().len(), 4);
    let path = FileSessionStore::from_config(&config).session_path("user_42");
    assert!(path.starts_with(dir.path()));
    assert!(path.exists());
}

#[tokio::test]
async fn tool_messages_round_trip_through_the_file_store() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path()));
    let session = Session::new("tools", store.clone());
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_call("call_9", "echo", serde_json::json!({"text": "hi"}));
    provider.queue_response("echoed");
    let echo = AgentTool::new(
        "echo",
        "Echo text",
        AgentToolParameters::object().string("text", "Text", true).build(),
        |args, _| async move { Ok(serde_json::json!(args.get_str("text")?)) },
    );
    let agent = Arc::new(AgentSpec::new("Echoer").with_tool(echo));

    Runner::new(provider)
        .run(&agent, "echo hi", RunOptions::new().with_session(session.clone()))
        .await
        .unwrap();

    let stored = session.get_items(None).await.unwrap();
    let roles: Vec<_> = stored.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
    assert_eq!(stored[1].tool_calls()[0].id, "call_9");
    assert_eq!(stored[2].call_id(), Some("call_9"));
    assert_eq!(stored[3].name.as_deref(), Some("Echoer"));
}

#[tokio::test]
async fn concurrent_appends_to_one_key_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path()));

    let writers: Vec<_> = (0..8)
        .map(|w| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let batch: Vec<_> = (0..5)
                    .map(|i| ModelMessage::user(format!("{w}-{i}")))
                    .collect();
                store.append("shared", &batch).await
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    let stored = texts(&store.read("shared", None).await.unwrap());
    assert_eq!(stored.len(), 40);
    for chunk in stored.chunks(5) {
        let writer = chunk[0].split('-').next().unwrap();
        for (i, text) in chunk.iter().enumerate() {
            assert_eq!(text, &format!("{writer}-{i}"));
        }
    }
}
