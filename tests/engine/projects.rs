use std::sync::Arc;

use serde_json::json;

use rsm_audit::{
    engine::simple_chain,
    manager::{InMemoryManager, ManagerCall},
    resources::key::ResourceKey,
};

use crate::fixtures::{add_project, add_quota, add_usage, engine_for};

fn manager_with_child_project() -> Arc<InMemoryManager> {
    let manager = Arc::new(InMemoryManager::new());
    add_project(&manager, "project_1", "child", "p1");
    add_quota(&manager, "child", "child_quota", json!(10));
    add_usage(&manager, "child", "child_usage", json!(["a", "b", "c"]));
    manager
}

#[tokio::test]
async fn given_project_entity_when_run_then_child_entities_are_collected_under_the_project() {
    let manager = manager_with_child_project();
    let mut engine = engine_for(manager.clone()).await;

    engine
        .run(&simple_chain(), false)
        .await
        .expect("run should succeed");

    let entry = engine
        .context()
        .ledger()
        .get(&ResourceKey::for_project("p1", "sys", "c"))
        .expect("child entry should be collected");
    assert_eq!(entry.availability(), Some(7.0));
    assert!(manager.calls().contains(&ManagerCall::ListNodeInstances {
        deployment_id: "child".to_string(),
    }));

    let errors = engine
        .validate_profile("p1", "{project: {sys: {c: 7}}}", true)
        .await
        .expect("validation should succeed");
    assert!(errors.is_empty());
}

#[tokio::test]
async fn given_same_project_twice_when_run_then_it_is_resolved_once() {
    let manager = manager_with_child_project();
    add_project(&manager, "project_2", "child", "p1");
    let mut engine = engine_for(manager.clone()).await;

    engine
        .run(&simple_chain(), false)
        .await
        .expect("run should succeed");

    let child_listings = manager
        .calls()
        .into_iter()
        .filter(|call| {
            matches!(call, ManagerCall::ListNodeInstances { deployment_id } if deployment_id == "child")
        })
        .count();
    assert_eq!(child_listings, 1);
    assert_eq!(engine.context().worklist().len(), 4);
}
