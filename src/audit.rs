use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    config::Config,
    engine::{Engine, RsmContext, chain_for_mode},
    entity::{
        adapters::{WorkflowContext, entities_from_deployment, entities_from_workflow},
        types::Entity,
    },
    execution::{poller::PollPolicy, runner::ExecutionRunner},
    manager::ports::ManagerPort,
    profile::ProfileValidationError,
};

/// Entities of the root deployment: the workflow's entity file when one is
/// configured, otherwise a query against the manager.
pub async fn load_root_entities(
    config: &Config,
    manager: &dyn ManagerPort,
) -> Result<Vec<Entity>> {
    match &config.run.entities_path {
        Some(path) => {
            let workflow = WorkflowContext::load(path)?;
            entities_from_workflow(&workflow)
                .with_context(|| format!("invalid entity in {}", path.display()))
        }
        None => entities_from_deployment(manager, &config.run.deployment_id)
            .await
            .with_context(|| {
                format!(
                    "failed to load entities of deployment {}",
                    config.run.deployment_id
                )
            }),
    }
}

/// Collects availability in the configured mode and validates the profile.
pub async fn run(
    config: &Config,
    manager: Arc<dyn ManagerPort>,
) -> Result<Vec<ProfileValidationError>> {
    let entities = load_root_entities(config, manager.as_ref()).await?;
    tracing::info!(
        target: "rsm.engine",
        deployment_id = %config.run.deployment_id,
        project_id = %config.run.project_id,
        mode = ?config.run.mode,
        entities = entities.len(),
        "audit_started"
    );

    let runner = ExecutionRunner::new(
        Arc::clone(&manager),
        PollPolicy::from_config(&config.poller),
    );
    let mut engine = Engine::new(RsmContext::new(entities, manager, runner));

    engine
        .run(&chain_for_mode(config.run.mode), config.run.report)
        .await
        .context("resource collection failed")?;

    let errors = engine
        .validate_profile(
            &config.run.project_id,
            &config.run.profile,
            config.run.fail_on_errors,
        )
        .await
        .context("profile validation failed")?;

    tracing::info!(
        target: "rsm.engine",
        issues = errors.len(),
        "audit_finished"
    );
    Ok(errors)
}
