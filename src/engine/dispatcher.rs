use serde_json::Value;
use tracing::Instrument;

use crate::{
    engine::{
        context::RsmContext,
        handlers::{HandlerChain, single_property},
    },
    error::{RsmError, requirements_not_met},
    profile::{ProfileValidationError, ResourcesProfile},
};

/// Drives the worklist through handler chains, one full pass per stage.
pub struct Engine {
    ctx: RsmContext,
}

impl Engine {
    pub fn new(ctx: RsmContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RsmContext {
        &self.ctx
    }

    /// Runs every stage in order. Each stage completes for all entities,
    /// including ones discovered while it runs, before the next begins.
    pub async fn run(&mut self, stages: &[HandlerChain], report: bool) -> Result<(), RsmError> {
        for (index, chain) in stages.iter().enumerate() {
            let handlers = chain
                .iter()
                .map(|handler| handler.name())
                .collect::<Vec<_>>()
                .join(",");
            let span = tracing::info_span!(
                target: "rsm.engine",
                "stage",
                stage = index + 1,
                handlers = %handlers
            );
            self.run_stage(chain).instrument(span).await?;

            if report {
                self.report_data();
            }
        }
        Ok(())
    }

    async fn run_stage(&mut self, chain: &HandlerChain) -> Result<(), RsmError> {
        tracing::info!(target: "rsm.engine", "stage_started");
        let mut dispatched = 0usize;

        let mut position = self.ctx.reset();
        while position.is_some() {
            if let Some(handler) = chain.iter().find(|handler| handler.can_handle(&self.ctx)) {
                let entity = self.ctx.current()?;
                let span = tracing::info_span!(
                    target: "rsm.engine",
                    "entity",
                    entity_id = %entity.id(),
                    project = %self.ctx.current_project()?,
                    entity_type = entity.entity_type().unwrap_or("-"),
                    handler = handler.name()
                );
                handler.handle(&mut self.ctx).instrument(span).await?;
                dispatched += 1;
            }
            position = self.ctx.next_entity();
        }

        tracing::info!(
            target: "rsm.engine",
            entities = self.ctx.worklist().len(),
            dispatched = dispatched,
            "stage_finished"
        );
        Ok(())
    }

    fn report_data(&self) {
        for (key, availability) in self.ctx.ledger().iter() {
            tracing::info!(
                target: "rsm.engine",
                key = %key,
                availability = %availability,
                "resource_availability"
            );
        }
    }

    /// Validates `profile_text` against everything collected for
    /// `project_id`, publishes the messages to every result entity and,
    /// with `escalate`, turns a non-empty list into an error.
    pub async fn validate_profile(
        &mut self,
        project_id: &str,
        profile_text: &str,
        escalate: bool,
    ) -> Result<Vec<ProfileValidationError>, RsmError> {
        let profile = ResourcesProfile::parse(profile_text)?;
        tracing::info!(
            target: "rsm.engine",
            project_id = %project_id,
            profile = %profile,
            "profile_validation_started"
        );

        let errors = profile.validate(self.ctx.ledger(), project_id);
        let messages: Vec<String> = errors.iter().map(ProfileValidationError::message).collect();

        for entity_id in self.ctx.result_entities() {
            let payload = single_property(
                "errors",
                Value::Array(messages.iter().cloned().map(Value::String).collect()),
            );
            self.ctx.set_runtime_properties(entity_id, payload).await?;
        }

        if messages.is_empty() {
            tracing::info!(target: "rsm.engine", "profile_validation_passed");
            return Ok(errors);
        }

        for message in &messages {
            tracing::error!(target: "rsm.engine", issue = %message, "profile_requirement_issue");
        }
        if escalate {
            return Err(requirements_not_met(format!(
                "resource availability issues found during profile validation: {}",
                messages.join("; ")
            )));
        }
        Ok(errors)
    }
}
