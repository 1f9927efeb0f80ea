//! End-to-end runs against the mock provider.

mod common;

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;

use common::MockProvider;
use roci_agents::prelude::*;

fn tutor(name: &str, topic: &str) -> AgentSpec {
    AgentSpec::new(name)
        .with_instructions(format!("You are a {topic} tutor. Answer using {topic}."))
        .with_handoff_description(format!("Answers {topic} questions"))
}

#[tokio::test]
async fn triage_routes_to_the_custom_named_tutor() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_call("call_1", "custom_history_tutor", json!({}));
    provider.queue_response("The Roman Empire fell in 476 AD.");

    let handed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&handed);
    let history = Handoff::new(Arc::new(tutor("History Tutor", "history")))
        .with_tool_name("custom_history_tutor")
        .with_tool_description("Historical context of the question")
        .with_on_handoff(move |_, _| sink.lock().unwrap().push("history"));
    let triage = Arc::new(
        AgentSpec::new("Triage Agent")
            .with_instructions("Route the question to the right tutor.")
            .with_handoff(history)
            .with_handoff(tutor("Math Tutor", "math")),
    );

    let runner = Runner::new(provider.clone());
    let result = runner
        .run(&triage, "When did Rome fall?", RunOptions::new())
        .await
        .unwrap();

    assert_eq!(result.last_agent_name(), "History Tutor");
    assert_eq!(result.final_output_text(), "The Roman Empire fell in 476 AD.");
    assert_eq!(*handed.lock().unwrap(), vec!["history"]);

    let requests = provider.requests();
    let offered: Vec<_> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(offered, vec!["custom_history_tutor", "transfer_to_math_tutor"]);
    assert_eq!(requests[0].tools[0].description, "Historical context of the question");
    assert!(requests[0].tools[1]
        .description
        .ends_with("Answers math questions"));
    assert_eq!(requests[1].agent_name, "History Tutor");
}

#[tokio::test]
async fn result_input_list_continues_a_conversation() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_response("Nice to meet you, Ada.");
    provider.queue_response("Your name is Ada.");
    let agent = Arc::new(AgentSpec::new("Assistant"));
    let runner = Runner::new(provider.clone());

    let first = runner.run(&agent, "I am Ada", RunOptions::new()).await.unwrap();
    let mut next = first.to_input_list();
    next.push(ModelMessage::user("What is my name?"));
    let second = runner.run(&agent, next, RunOptions::new()).await.unwrap();

    assert_eq!(second.final_output_text(), "Your name is Ada.");
    assert_eq!(provider.requests()[1].messages.len(), 3);
}

#[tokio::test]
async fn run_context_counter_is_visible_to_tools() {
    #[derive(Default)]
    struct Calls {
        count: std::sync::atomic::AtomicUsize,
    }

    let counter = AgentTool::new("count", "Count calls", AgentToolParameters::empty(), |_, ctx| async move {
        let calls = ctx
            .run_context
            .state::<Calls>()
            .ok_or_else(|| RociError::InvalidArgument("missing call counter".into()))?;
        let n = calls.count.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        Ok(json!(n))
    });
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_call("c1", "count", json!({}));
    provider.queue_tool_call("c2", "count", json!({}));
    provider.queue_response("counted twice");
    let agent = Arc::new(AgentSpec::new("Counter").with_tool(counter));
    let state = Arc::new(Calls::default());

    let result = Runner::new(provider)
        .run(
            &agent,
            "count",
            RunOptions::new().with_context(RunContext::from_arc(Arc::clone(&state))),
        )
        .await
        .unwrap();

    assert_eq!(state.count.load(std::sync::atomic::Ordering::SeqCst), 2);
    let outputs: Vec<_> = result.tool_calls.iter().map(|r| r.result.clone()).collect();
    assert_eq!(outputs, vec![json!(1), json!(2)]);
}

#[tokio::test]
async fn typed_output_contract_yields_structured_output() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Weather {
        city: String,
        celsius: f64,
    }

    let provider = Arc::new(MockProvider::new());
    provider.queue_response("```json\n{\"city\": \"Karachi\", \"celsius\": 31.5}\n```");
    let agent = Arc::new(AgentSpec::new("Forecaster").with_output_contract(
        OutputContract::typed::<Weather>(
            "weather",
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string"},
                    "celsius": {"type": "number"}
                },
                "required": ["city", "celsius"]
            }),
        ),
    ));

    let result = Runner::new(provider)
        .run(&agent, "weather in Karachi", RunOptions::new())
        .await
        .unwrap();

    let weather: Weather = result.final_output_as().unwrap();
    assert_eq!(
        weather,
        Weather {
            city: "Karachi".into(),
            celsius: 31.5
        }
    );
}

#[tokio::test]
async fn custom_tool_use_behavior_decides_final_output() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_call("c1", "lookup", json!({"city": "Lahore"}));
    let lookup = AgentTool::new(
        "lookup",
        "Weather lookup",
        AgentToolParameters::object().string("city", "City", true).build(),
        |args, _| async move { Ok(json!({"city": args.get_str("city")?, "sky": "clear"})) },
    );
    let agent = Arc::new(AgentSpec::new("Weather").with_tool(lookup).with_tool_use_behavior(
        ToolUseBehavior::custom(|_, results| {
            let summary = results
                .iter()
                .map(|r| format!("{}: {}", r.tool_name, r.output["sky"]))
                .collect::<Vec<_>>()
                .join(", ");
            roci_agents::agent::ToolsToFinalOutputResult::final_output(json!(summary))
        }),
    ));

    let result = Runner::new(provider.clone())
        .run(&agent, "weather in Lahore", RunOptions::new())
        .await
        .unwrap();

    assert_eq!(result.final_output_text(), "lookup: \"clear\"");
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn lifecycle_hooks_fire_for_agent_and_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (run_sink, agent_sink) = (Arc::clone(&log), Arc::clone(&log));
    let run_hooks = Hooks::new().on(move |_, event| {
        if let LifecycleEvent::AgentEnd { agent, .. } = event {
            run_sink.lock().unwrap().push(format!("run:end:{agent}"));
        }
    });
    let agent_hooks = Hooks::new().on(move |_, event| {
        if let LifecycleEvent::AgentEnd { output, .. } = event {
            agent_sink.lock().unwrap().push(format!("agent:end:{output}"));
        }
    });
    let provider = Arc::new(MockProvider::new());
    provider.queue_response("done");
    let agent = Arc::new(AgentSpec::new("Worker").with_hooks(agent_hooks));

    Runner::new(provider)
        .run(&agent, "work", RunOptions::new().with_hooks(run_hooks))
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["run:end:Worker".to_string(), "agent:end:\"done\"".to_string()]
    );
}
