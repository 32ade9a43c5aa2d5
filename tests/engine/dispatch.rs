use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use rsm_audit::{
    engine::{Handler, HandlerChain, RsmContext, boxed},
    error::RsmError,
    entity::types::NODE_TYPE_QUOTA,
};

use crate::fixtures::{engine_for, standard_manager};

type Journal = Arc<Mutex<Vec<String>>>;

/// Accepts every entity of one type and journals what it handled.
struct Recording {
    name: &'static str,
    entity_type: Option<&'static str>,
    journal: Journal,
}

#[async_trait]
impl Handler for Recording {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        ctx.current().is_ok_and(|entity| match self.entity_type {
            Some(entity_type) => entity.is_of_type(entity_type),
            None => true,
        })
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        let entity_id = ctx.current()?.id().to_string();
        self.journal
            .lock()
            .expect("journal lock")
            .push(format!("{}:{}", self.name, entity_id));
        Ok(())
    }
}

fn recording(name: &'static str, entity_type: Option<&'static str>, journal: &Journal) -> Box<dyn Handler> {
    boxed(Recording {
        name,
        entity_type,
        journal: journal.clone(),
    })
}

#[tokio::test]
async fn given_two_matching_handlers_when_dispatched_then_only_the_first_runs() {
    let journal = Journal::default();
    let stages: Vec<HandlerChain> = vec![vec![
        recording("quota_first", Some(NODE_TYPE_QUOTA), &journal),
        recording("catch_all", None, &journal),
    ]];
    let mut engine = engine_for(standard_manager()).await;

    engine.run(&stages, false).await.expect("run should succeed");

    assert_eq!(
        *journal.lock().expect("journal lock"),
        vec![
            "quota_first:quota_1".to_string(),
            "catch_all:usage_1".to_string(),
            "catch_all:result_1".to_string(),
        ]
    );
}

#[tokio::test]
async fn given_several_stages_when_run_then_each_stage_visits_every_entity_in_order() {
    let journal = Journal::default();
    let stages: Vec<HandlerChain> = vec![
        vec![recording("first", None, &journal)],
        vec![recording("second", Some(NODE_TYPE_QUOTA), &journal)],
    ];
    let mut engine = engine_for(standard_manager()).await;

    engine.run(&stages, false).await.expect("run should succeed");

    let journal = journal.lock().expect("journal lock").clone();
    assert_eq!(
        journal,
        vec![
            "first:quota_1",
            "first:usage_1",
            "first:result_1",
            "second:quota_1",
        ]
    );
}

#[tokio::test]
async fn given_unhandled_entities_when_run_then_they_are_skipped_without_error() {
    let mut engine = engine_for(standard_manager()).await;
    let stages: Vec<HandlerChain> = vec![Vec::new()];

    engine.run(&stages, false).await.expect("empty chain should succeed");

    assert!(engine.context().ledger().is_empty());
    let dump = engine.context().dump();
    let instances = &dump["instances"];
    assert_eq!(instances["total"], json!(3));
    assert_eq!(
        instances["processed"],
        json!(["quota_1", "usage_1", "result_1"])
    );
    assert_eq!(instances["to_be_processed"], json!([]));
}
