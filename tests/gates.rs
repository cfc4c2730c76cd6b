//! Test: human-approval gates

mod helpers;

use helpers::*;
use std::sync::{Arc, Mutex};
use taskpipe::execution::{EventHandler, PipelineRunner, RunEvent, RunOptions};

#[tokio::test]
async fn test_gates_auto_approve_by_default() {
    let pipeline = pipeline_from_yaml(
        r#"
name: "Auto Approved"
steps:
  - id: "gated"
    task: "implement the release"
    gate:
      message: "Ship it?"
"#,
    );

    let agent = Arc::new(StubAgent::new("stub"));
    let result = run_with_agent(&pipeline, agent).await;

    assert_run_succeeded(&result);
    assert_step_ran(&result, "gated", "ran gated");
}

#[tokio::test]
async fn test_denied_gate_halts_with_partial_results() {
    let pipeline = pipeline_from_yaml(
        r#"
name: "Denied"
steps:
  - id: "prepare"
    task: "prepare the release"
  - id: "deploy"
    task: "deploy to production"
    dependsOn: ["prepare"]
    gate:
      message: "Really deploy?"
  - id: "announce"
    task: "document the release"
    dependsOn: ["deploy"]
"#,
    );

    let agent = Arc::new(StubAgent::new("stub"));
    let registry = registry_with(vec![agent.clone()]);
    let result = PipelineRunner::new(registry)
        .with_approval_handler(Arc::new(DenyGates))
        .run(&pipeline, RunOptions::default())
        .await
        .unwrap();

    assert_run_failed(&result, "stopped at gate before step 'deploy'");
    // Results cover the steps reached before the gate, nothing after
    assert_executed_order(&result, &["prepare"]);
    assert_eq!(agent.call_count("deploy"), 0);
    assert_eq!(agent.call_count("announce"), 0);
}

#[tokio::test]
async fn test_selective_approval() {
    let pipeline = pipeline_from_yaml(
        r#"
name: "Selective"
steps:
  - id: "first"
    task: "first gated work"
    gate: {}
  - id: "second"
    task: "second gated work"
    dependsOn: ["first"]
    gate: {}
"#,
    );

    let agent = Arc::new(StubAgent::new("stub"));
    let registry = registry_with(vec![agent]);
    let result = PipelineRunner::new(registry)
        .with_approval_handler(Arc::new(ApproveOnly(vec!["first".to_string()])))
        .run(&pipeline, RunOptions::default())
        .await
        .unwrap();

    assert_run_failed(&result, "stopped at gate before step 'second'");
    assert_executed_order(&result, &["first"]);
}

#[tokio::test]
async fn test_disabled_gate_does_not_prompt() {
    let pipeline = pipeline_from_yaml(
        r#"
name: "Disabled Gate"
steps:
  - id: "work"
    task: "routine work"
    gate:
      enabled: false
      message: "should never be asked"
"#,
    );

    let agent = Arc::new(StubAgent::new("stub"));
    let registry = registry_with(vec![agent]);
    // Denying handler proves the gate is never consulted
    let result = PipelineRunner::new(registry)
        .with_approval_handler(Arc::new(DenyGates))
        .run(&pipeline, RunOptions::default())
        .await
        .unwrap();

    assert_run_succeeded(&result);
}

#[tokio::test]
async fn test_condition_skips_before_the_gate_prompts() {
    let pipeline = pipeline_from_yaml(
        r#"
name: "Conditioned Gate"
env:
  DEPLOY_ENV: "staging"
steps:
  - id: "a"
    task: "prepare the release"
  - id: "b"
    task: "deploy to production"
    dependsOn: ["a"]
    condition: "env.DEPLOY_ENV == 'production'"
    gate:
      message: "Really deploy?"
  - id: "c"
    task: "document the outcome"
    dependsOn: ["a"]
"#,
    );

    let agent = Arc::new(StubAgent::new("stub"));
    let registry = registry_with(vec![agent.clone()]);
    // The denying handler must never be asked about a step that skips
    let result = PipelineRunner::new(registry)
        .with_approval_handler(Arc::new(DenyGates))
        .run(&pipeline, RunOptions::default())
        .await
        .unwrap();

    assert_run_succeeded(&result);
    assert_step_skipped(&result, "b", "not met");
    assert_step_ran(&result, "c", "ran c");
    assert_eq!(agent.call_count("b"), 0);
}

#[tokio::test]
async fn test_gate_waiting_event_carries_message() {
    let pipeline = pipeline_from_yaml(
        r#"
name: "Gate Event"
steps:
  - id: "gated"
    task: "gated work"
    gate:
      message: "Proceed with the rollout?"
"#,
    );

    let messages: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let handler: EventHandler = Arc::new(move |event| {
        if let RunEvent::GateWaiting { step_id, message } = event {
            sink.lock().unwrap().push((step_id, message));
        }
    });

    let agent = Arc::new(StubAgent::new("stub"));
    let registry = registry_with(vec![agent]);
    let result = PipelineRunner::new(registry)
        .with_event_handler(handler)
        .run(&pipeline, RunOptions::default())
        .await
        .unwrap();

    assert_run_succeeded(&result);
    let seen = messages.lock().unwrap();
    assert_eq!(
        seen.as_slice(),
        [(
            "gated".to_string(),
            "Proceed with the rollout?".to_string()
        )]
    );
}
