use serde_json::{Value, json};

use rsm_audit::{
    engine::{parallel_chain, simple_chain},
    error::RsmErrorKind,
    manager::ManagerCall,
    resources::key::ResourceKey,
};

use crate::fixtures::{add_project, add_quota, add_usage, engine_for, profile, standard_manager};

fn collected_key() -> ResourceKey {
    ResourceKey::for_project("global", "sys", "c")
}

#[tokio::test]
async fn given_quota_and_usage_when_simple_mode_runs_then_availability_is_their_difference() {
    let manager = standard_manager();
    let mut engine = engine_for(manager.clone()).await;

    engine
        .run(&simple_chain(), true)
        .await
        .expect("simple run should succeed");

    let entry = engine
        .context()
        .ledger()
        .get(&collected_key())
        .expect("entry should be collected");
    assert_eq!(entry.quota(), Some(5.0));
    assert_eq!(entry.usage(), Some(2.0));
    assert_eq!(entry.availability(), Some(3.0));

    assert!(manager.calls().contains(&ManagerCall::StartExecution {
        deployment_id: "root".to_string(),
        node_instance_ids: vec!["usage_1".to_string()],
        operation: Some("list".to_string()),
    }));
}

#[tokio::test]
async fn given_requirement_equal_to_availability_when_validated_then_no_errors() {
    let mut engine = engine_for(standard_manager()).await;
    engine
        .run(&simple_chain(), false)
        .await
        .expect("simple run should succeed");

    let errors = engine
        .validate_profile("p1", &profile(3.0), true)
        .await
        .expect("validation should succeed");
    assert!(errors.is_empty());
}

#[tokio::test]
async fn given_requirement_above_availability_when_validated_then_one_error_is_reported() {
    let mut engine = engine_for(standard_manager()).await;
    engine
        .run(&simple_chain(), false)
        .await
        .expect("simple run should succeed");

    let errors = engine
        .validate_profile("p1", &profile(4.0), false)
        .await
        .expect("validation should succeed");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].availability(), Some(3.0));
    assert_eq!(errors[0].requirement(), 4.0);
}

#[tokio::test]
async fn given_escalation_when_requirements_are_not_met_then_run_fails() {
    let mut engine = engine_for(standard_manager()).await;
    engine
        .run(&simple_chain(), false)
        .await
        .expect("simple run should succeed");

    let err = engine
        .validate_profile("p1", &profile(10.0), true)
        .await
        .expect_err("unmet requirement should escalate");
    assert_eq!(err.kind, RsmErrorKind::RequirementsNotMet);
    assert!(err.message.contains("Requirement is c=10, but only 3 is available"));
}

#[tokio::test]
async fn given_parallel_mode_when_run_then_it_collects_the_same_ledger_as_simple_mode() {
    let manager = standard_manager();
    let mut engine = engine_for(manager.clone()).await;

    engine
        .run(&parallel_chain(), false)
        .await
        .expect("parallel run should succeed");

    let entry = engine
        .context()
        .ledger()
        .get(&collected_key())
        .expect("entry should be collected");
    assert_eq!(entry.availability(), Some(3.0));

    let starts = manager
        .calls()
        .into_iter()
        .filter(|call| matches!(call, ManagerCall::StartExecution { .. }))
        .count();
    assert_eq!(starts, 1);
}

#[tokio::test]
async fn given_result_entity_when_run_and_validated_then_data_and_errors_are_written_back() {
    let manager = standard_manager();
    let mut engine = engine_for(manager.clone()).await;

    engine
        .run(&simple_chain(), false)
        .await
        .expect("simple run should succeed");
    assert_eq!(engine.context().result_entities().to_vec(), vec!["result_1".to_string()]);

    engine
        .validate_profile("p1", &profile(4.0), false)
        .await
        .expect("validation should succeed");

    let stored = manager
        .runtime_properties("result_1")
        .expect("result instance should exist");
    assert_eq!(
        stored["data"]["availability"]["global"]["sys"]["c"]["availability"],
        json!(3.0)
    );
    let errors = stored["errors"].as_array().expect("errors should be a list");
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], Value::String(message) if message.starts_with("Profile requirement not met")));
}

#[tokio::test]
async fn given_child_project_when_parallel_mode_runs_then_all_executions_start_before_any_is_polled() {
    let manager = standard_manager();
    add_project(&manager, "project_1", "child", "p1");
    add_quota(&manager, "child", "child_quota", json!(10));
    add_usage(&manager, "child", "child_usage", json!(["a", "b", "c"]));
    let mut engine = engine_for(manager.clone()).await;

    engine
        .run(&parallel_chain(), false)
        .await
        .expect("parallel run should succeed");

    let calls = manager.calls();
    let starts: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, call)| matches!(call, ManagerCall::StartExecution { .. }))
        .map(|(position, _)| position)
        .collect();
    let first_poll = calls
        .iter()
        .position(|call| matches!(call, ManagerCall::GetExecution { .. }))
        .expect("executions should be polled");
    assert_eq!(starts.len(), 2);
    assert!(starts.iter().all(|&position| position < first_poll));
    assert!(calls.contains(&ManagerCall::StartExecution {
        deployment_id: "child".to_string(),
        node_instance_ids: vec!["child_usage".to_string()],
        operation: Some("list".to_string()),
    }));

    let ledger = engine.context().ledger();
    let child = ledger
        .get(&ResourceKey::for_project("p1", "sys", "c"))
        .expect("child entry should be collected");
    assert_eq!(child.usage(), Some(3.0));
    assert_eq!(child.availability(), Some(7.0));
    assert_eq!(
        ledger
            .get(&collected_key())
            .and_then(|entry| entry.availability()),
        Some(3.0)
    );
}
