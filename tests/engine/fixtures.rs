use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};

use rsm_audit::{
    engine::{Engine, RsmContext},
    entity::{PropertyBag, entities_from_deployment, types},
    execution::{ExecutionRunner, PollPolicy},
    manager::{ExecutionScript, InMemoryManager},
};

pub const ROOT_DEPLOYMENT: &str = "root";

pub fn bag(value: Value) -> PropertyBag {
    match value {
        Value::Object(map) => map,
        _ => PropertyBag::new(),
    }
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(1),
        timeout: Some(Duration::from_secs(5)),
        ..PollPolicy::default()
    }
}

pub fn add_quota(manager: &InMemoryManager, deployment_id: &str, id: &str, quota: Value) {
    manager.add_entity(
        deployment_id,
        id,
        types::NODE_TYPE_QUOTA,
        bag(json!({
            "system_name": "sys",
            "resource_name": "c",
            "runtime_property_name": "quota"
        })),
        bag(json!({ "quota": quota })),
    );
}

/// Usage entity whose `list` operation terminates and writes `items`.
pub fn add_usage(manager: &InMemoryManager, deployment_id: &str, id: &str, items: Value) {
    manager.add_entity(
        deployment_id,
        id,
        types::NODE_TYPE_USAGE,
        bag(json!({
            "system_name": "sys",
            "resource_name": "c",
            "runtime_property_name": "items",
            "operation_inputs": {"filter": "all"}
        })),
        PropertyBag::new(),
    );
    manager.script_execution(id, ExecutionScript::terminated_with(bag(json!({ "items": items }))));
}

/// Root-deployment project entity pointing at `deployment_id`.
pub fn add_project(manager: &InMemoryManager, id: &str, deployment_id: &str, project_name: &str) {
    manager.add_entity(
        ROOT_DEPLOYMENT,
        id,
        types::NODE_TYPE_PROJECT,
        bag(json!({"deployment_id": deployment_id, "project_name": project_name})),
        PropertyBag::new(),
    );
}

pub fn add_result(manager: &InMemoryManager, deployment_id: &str, id: &str) {
    manager.add_entity(
        deployment_id,
        id,
        types::NODE_TYPE_RESULT,
        PropertyBag::new(),
        PropertyBag::new(),
    );
}

/// Quota of 5, two used items and one result entity in the root deployment.
pub fn standard_manager() -> Arc<InMemoryManager> {
    let manager = Arc::new(InMemoryManager::new());
    add_quota(&manager, ROOT_DEPLOYMENT, "quota_1", json!("5"));
    add_usage(&manager, ROOT_DEPLOYMENT, "usage_1", json!(["vm-a", "vm-b"]));
    add_result(&manager, ROOT_DEPLOYMENT, "result_1");
    manager
}

pub async fn engine_for(manager: Arc<InMemoryManager>) -> Engine {
    let entities = entities_from_deployment(manager.as_ref(), ROOT_DEPLOYMENT)
        .await
        .expect("root entities should load");
    let runner = ExecutionRunner::new(manager.clone(), fast_policy());
    Engine::new(RsmContext::new(entities, manager, runner))
}

pub fn profile(requirement: f64) -> String {
    format!("{{global: {{sys: {{c: {}}}}}}}", requirement)
}
