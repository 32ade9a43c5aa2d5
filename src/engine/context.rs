use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    entity::{
        adapters::entities_from_deployment,
        types::{Entity, PROPERTY_DEPLOYMENT_ID, PROPERTY_PROJECT_NAME, PropertyBag},
        worklist::{EntityIndex, Worklist},
    },
    error::{RsmError, invalid_state},
    execution::runner::ExecutionRunner,
    manager::{ports::ManagerPort, types::NodeInstanceUpdate},
    resources::{
        availability::{Amount, AvailabilityLedger},
        key::ResourceKey,
    },
};

pub const DEFAULT_OPERATION_NAME: &str = "list";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Quota,
    Usage,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Quota => "quota",
            ValueKind::Usage => "usage",
        }
    }
}

/// State of one audit run, handed to every handler by reference.
pub struct RsmContext {
    worklist: Worklist,
    ledger: AvailabilityLedger,
    manager: Arc<dyn ManagerPort>,
    runner: ExecutionRunner,
    result_entities: Vec<String>,
}

impl RsmContext {
    pub fn new(
        entities: Vec<Entity>,
        manager: Arc<dyn ManagerPort>,
        runner: ExecutionRunner,
    ) -> Self {
        Self {
            worklist: Worklist::new(entities),
            ledger: AvailabilityLedger::new(),
            manager,
            runner,
            result_entities: Vec::new(),
        }
    }

    pub fn worklist(&self) -> &Worklist {
        &self.worklist
    }

    pub fn ledger(&self) -> &AvailabilityLedger {
        &self.ledger
    }

    pub fn result_entities(&self) -> &[String] {
        &self.result_entities
    }

    pub fn reset(&mut self) -> Option<EntityIndex> {
        let first = self.worklist.reset();
        if first.is_some() {
            self.log_state();
        }
        first
    }

    pub fn next_entity(&mut self) -> Option<EntityIndex> {
        let next = self.worklist.next();
        if next.is_some() {
            self.log_state();
        }
        next
    }

    pub fn current(&self) -> Result<&Entity, RsmError> {
        self.worklist.current()
    }

    pub fn current_project(&self) -> Result<&str, RsmError> {
        self.worklist.current_project()
    }

    /// Key of a value collected for the current entity. `resource_name`
    /// falls back to the entity's declared resource.
    pub fn resource_key(&self, resource_name: Option<&str>) -> Result<ResourceKey, RsmError> {
        let entity = self.current()?;
        let resource_name = resource_name.or(entity.resource_name()).ok_or_else(|| {
            invalid_state(format!(
                "entity '{}' declares no resource_name and none was supplied",
                entity.id()
            ))
        })?;
        let system_name = entity.system_name().unwrap_or_default();
        Ok(ResourceKey::for_project(
            self.current_project()?,
            system_name,
            resource_name,
        ))
    }

    pub fn record(
        &mut self,
        kind: ValueKind,
        resource_name: &str,
        amount: Amount,
    ) -> Result<(), RsmError> {
        let key = self.resource_key(Some(resource_name))?;
        tracing::debug!(
            target: "rsm.handler",
            key = %key,
            kind = kind.as_str(),
            amount = amount.as_f64(),
            "value_recorded"
        );
        let (quota, usage) = match kind {
            ValueKind::Quota => (Some(amount.as_f64()), None),
            ValueKind::Usage => (None, Some(amount)),
        };
        self.ledger.record(key, quota, usage)
    }

    /// Registers the child deployment referenced by the current entity as a
    /// new project. Missing references are warnings, not failures.
    pub async fn resolve_project(&mut self) -> Result<bool, RsmError> {
        let entity = self.current()?;
        let entity_id = entity.id().to_string();
        let Some(deployment_id) = non_empty(entity.property_str(PROPERTY_DEPLOYMENT_ID)) else {
            tracing::warn!(
                target: "rsm.handler",
                entity_id = %entity_id,
                property = PROPERTY_DEPLOYMENT_ID,
                "project_reference_incomplete"
            );
            return Ok(false);
        };
        let Some(project_name) = non_empty(entity.property_str(PROPERTY_PROJECT_NAME)) else {
            tracing::warn!(
                target: "rsm.handler",
                entity_id = %entity_id,
                property = PROPERTY_PROJECT_NAME,
                "project_reference_incomplete"
            );
            return Ok(false);
        };

        if self.worklist.projects().any(|known| known == project_name) {
            tracing::warn!(
                target: "rsm.handler",
                entity_id = %entity_id,
                project = %project_name,
                "project_already_registered"
            );
            return Ok(false);
        }

        let entities = entities_from_deployment(self.manager.as_ref(), &deployment_id).await?;
        let discovered = entities.len();
        let added = self.worklist.add_project(&project_name, entities);
        if added {
            tracing::info!(
                target: "rsm.handler",
                entity_id = %entity_id,
                project = %project_name,
                deployment_id = %deployment_id,
                entities = discovered,
                "project_resolved"
            );
        }
        Ok(added)
    }

    /// Starts the usage operation of the current entity. With `wait` the
    /// result bag is returned; otherwise the execution id is kept on the
    /// entity for a later [`execution_result`](Self::execution_result).
    pub async fn run_execution(&mut self, wait: bool) -> Result<Option<PropertyBag>, RsmError> {
        let entity = self.current()?;
        let deployment_id = entity.deployment_id().to_string();
        let entity_id = entity.id().to_string();
        let inputs = entity.operation_inputs()?;

        let execution_id = self
            .runner
            .start(&deployment_id, &entity_id, DEFAULT_OPERATION_NAME, inputs)
            .await?;

        if !wait {
            self.worklist.current_mut()?.set_execution_id(execution_id);
            return Ok(None);
        }

        let result = self.runner.wait_for_result(&execution_id, &entity_id).await?;
        Ok(Some(result))
    }

    /// Waits for the execution started earlier for the current entity.
    /// `None` when nothing was started.
    pub async fn execution_result(&mut self) -> Result<Option<PropertyBag>, RsmError> {
        let entity = self.worklist.current_mut()?;
        let entity_id = entity.id().to_string();
        let Some(execution_id) = entity.take_execution_id() else {
            return Ok(None);
        };
        let result = self.runner.wait_for_result(&execution_id, &entity_id).await?;
        Ok(Some(result))
    }

    pub fn set_current_runtime_properties(
        &mut self,
        runtime_properties: PropertyBag,
    ) -> Result<(), RsmError> {
        self.worklist
            .current_mut()?
            .set_runtime_properties(runtime_properties);
        Ok(())
    }

    pub fn add_result_entity(&mut self, entity_id: &str) {
        if !self.result_entities.iter().any(|known| known == entity_id) {
            self.result_entities.push(entity_id.to_string());
        }
    }

    /// Merges `properties` into the stored runtime properties of `entity_id`
    /// using the version read right before the write.
    pub async fn set_runtime_properties(
        &self,
        entity_id: &str,
        properties: PropertyBag,
    ) -> Result<(), RsmError> {
        let instance = self.manager.get_node_instance(entity_id).await?;
        let mut runtime_properties = instance.runtime_properties;
        runtime_properties.extend(properties);

        self.manager
            .update_node_instance(
                entity_id,
                NodeInstanceUpdate {
                    runtime_properties,
                    version: instance.version,
                },
            )
            .await?;
        tracing::debug!(
            target: "rsm.manager",
            entity_id = %entity_id,
            version = instance.version,
            "runtime_properties_written"
        );
        Ok(())
    }

    pub fn dump(&self) -> Value {
        json!({
            "availability": self.ledger.tree(),
            "instances": self.worklist.dump(),
        })
    }

    fn log_state(&self) {
        let Ok(entity) = self.worklist.current() else {
            return;
        };
        let backlog = self
            .worklist
            .backlog()
            .into_iter()
            .map(|project| format!("{}={}", project.project, project.pending))
            .collect::<Vec<_>>()
            .join(" | ");
        tracing::debug!(
            target: "rsm.worklist",
            entity_id = %entity.id(),
            project = self.worklist.current_project().unwrap_or_default(),
            total = self.worklist.len(),
            left = %backlog,
            "worklist_advanced"
        );
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
