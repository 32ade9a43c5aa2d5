use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};

use rsm_audit::{
    entity::PropertyBag,
    error::RsmErrorKind,
    execution::{ExecutionRunner, PollOutcome, PollPolicy},
    manager::{ExecutionScript, InMemoryManager, ManagerCall},
};

fn bag(value: Value) -> PropertyBag {
    match value {
        Value::Object(map) => map,
        _ => PropertyBag::new(),
    }
}

fn policy(timeout: Option<Duration>) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(1),
        timeout,
        ..PollPolicy::default()
    }
}

fn manager_with_usage() -> Arc<InMemoryManager> {
    let manager = Arc::new(InMemoryManager::new());
    manager.add_entity(
        "dep",
        "usage_1",
        "cloudify.nodes.resource_management.Usage",
        PropertyBag::new(),
        bag(json!({"stale": true})),
    );
    manager
}

#[tokio::test]
async fn given_execution_passes_through_pending_states_when_awaited_then_fresh_properties_are_returned() {
    let manager = manager_with_usage();
    manager.script_execution(
        "usage_1",
        ExecutionScript::statuses(&["pending", "started", "terminated"])
            .producing(bag(json!({"items": [1, 2, 3]}))),
    );
    let runner = ExecutionRunner::new(manager.clone(), policy(Some(Duration::from_secs(5))));

    let result = runner
        .run_and_wait("dep", "usage_1", "list", PropertyBag::new())
        .await
        .expect("execution should succeed");

    assert_eq!(result, bag(json!({"stale": true, "items": [1, 2, 3]})));
    let status_checks = manager
        .calls()
        .into_iter()
        .filter(|call| matches!(call, ManagerCall::GetExecution { .. }))
        .count();
    assert_eq!(status_checks, 3);
}

#[tokio::test]
async fn given_execution_never_finishes_when_timeout_passes_then_result_is_empty() {
    let manager = manager_with_usage();
    manager.script_execution("usage_1", ExecutionScript::statuses(&["started"]));
    let runner = ExecutionRunner::new(manager.clone(), policy(Some(Duration::from_millis(20))));

    let result = runner
        .run_and_wait("dep", "usage_1", "list", PropertyBag::new())
        .await
        .expect("timeout is not an error");

    assert!(result.is_empty());
}

#[tokio::test]
async fn given_timeout_when_waiting_directly_then_timed_out_outcome_is_returned() {
    let manager = manager_with_usage();
    manager.script_execution("usage_1", ExecutionScript::statuses(&["started"]));
    let runner = ExecutionRunner::new(manager.clone(), policy(None));
    let execution_id = runner
        .start("dep", "usage_1", "list", PropertyBag::new())
        .await
        .expect("start should succeed");

    let outcome = policy(Some(Duration::from_millis(10)))
        .wait(manager.as_ref(), &execution_id)
        .await
        .expect("timeout is not an error");
    assert!(matches!(outcome, PollOutcome::TimedOut { .. }));
}

#[tokio::test]
async fn given_failure_status_when_awaited_then_execution_failed_is_returned() {
    let manager = manager_with_usage();
    manager.script_execution("usage_1", ExecutionScript::statuses(&["started", "failed"]));
    let runner = ExecutionRunner::new(manager.clone(), policy(Some(Duration::from_secs(5))));

    let err = runner
        .run_and_wait("dep", "usage_1", "list", PropertyBag::new())
        .await
        .expect_err("failed execution should surface");
    assert_eq!(err.kind, RsmErrorKind::ExecutionFailed);
}

#[tokio::test]
async fn given_missing_status_when_awaited_then_missing_status_is_returned() {
    let manager = manager_with_usage();
    manager.script_execution("usage_1", ExecutionScript::statuses(&[""]));
    let runner = ExecutionRunner::new(manager.clone(), policy(Some(Duration::from_secs(5))));

    let err = runner
        .run_and_wait("dep", "usage_1", "list", PropertyBag::new())
        .await
        .expect_err("missing status should surface");
    assert_eq!(err.kind, RsmErrorKind::MissingStatus);
}

#[tokio::test]
async fn given_status_check_transport_error_when_awaited_then_communication_error_is_returned() {
    let manager = manager_with_usage();
    manager.fail_status_checks();
    let runner = ExecutionRunner::new(manager.clone(), policy(Some(Duration::from_secs(5))));

    let err = runner
        .run_and_wait("dep", "usage_1", "list", PropertyBag::new())
        .await
        .expect_err("transport failure should surface");
    assert_eq!(err.kind, RsmErrorKind::Communication);
    assert!(err.message.starts_with("error during polling execution exec-1 state"));
}
