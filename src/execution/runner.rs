use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    entity::types::PropertyBag,
    error::RsmError,
    execution::poller::{PollOutcome, PollPolicy},
    manager::{
        ports::ManagerPort,
        types::{ExecutionRequest, WORKFLOW_EXECUTE_OPERATION},
    },
};

/// Starts remote operations against single node instances and waits for
/// their results.
#[derive(Clone)]
pub struct ExecutionRunner {
    manager: Arc<dyn ManagerPort>,
    policy: PollPolicy,
}

impl ExecutionRunner {
    pub fn new(manager: Arc<dyn ManagerPort>, policy: PollPolicy) -> Self {
        Self { manager, policy }
    }

    pub async fn start(
        &self,
        deployment_id: &str,
        entity_id: &str,
        operation: &str,
        operation_inputs: PropertyBag,
    ) -> Result<String, RsmError> {
        let inputs = Value::Object(operation_inputs);
        tracing::debug!(
            target: "rsm.execution",
            deployment_id = %deployment_id,
            entity_id = %entity_id,
            operation = %operation,
            inputs = %inputs,
            "execution_starting"
        );

        let request = ExecutionRequest {
            deployment_id: deployment_id.to_string(),
            workflow_id: WORKFLOW_EXECUTE_OPERATION.to_string(),
            parameters: json!({
                "node_instance_ids": [entity_id],
                "operation": operation,
                "operation_kwargs": inputs,
                "allow_kwargs_override": true,
            }),
            allow_custom_parameters: true,
            force: true,
        };
        let execution = self.manager.start_execution(request).await?;

        tracing::debug!(
            target: "rsm.execution",
            entity_id = %entity_id,
            execution_id = %execution.id,
            "execution_started"
        );
        Ok(execution.id)
    }

    /// Fresh runtime properties of `entity_id` once `execution_id` succeeds;
    /// an empty bag when the wait timed out.
    pub async fn wait_for_result(
        &self,
        execution_id: &str,
        entity_id: &str,
    ) -> Result<PropertyBag, RsmError> {
        match self.policy.wait(self.manager.as_ref(), execution_id).await? {
            PollOutcome::Succeeded { status } => {
                tracing::debug!(
                    target: "rsm.execution",
                    execution_id = %execution_id,
                    entity_id = %entity_id,
                    status = %status,
                    "execution_succeeded"
                );
                let instance = self.manager.get_node_instance(entity_id).await?;
                Ok(instance.runtime_properties)
            }
            PollOutcome::TimedOut { .. } => Ok(PropertyBag::new()),
        }
    }

    pub async fn run_and_wait(
        &self,
        deployment_id: &str,
        entity_id: &str,
        operation: &str,
        operation_inputs: PropertyBag,
    ) -> Result<PropertyBag, RsmError> {
        let execution_id = self
            .start(deployment_id, entity_id, operation, operation_inputs)
            .await?;
        self.wait_for_result(&execution_id, entity_id).await
    }
}
