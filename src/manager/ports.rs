use async_trait::async_trait;

use crate::{
    error::RsmError,
    manager::types::{Execution, ExecutionRequest, Node, NodeInstance, NodeInstanceUpdate},
};

/// Remote side of the audit: executions, node instances and nodes of the
/// orchestration manager.
#[async_trait]
pub trait ManagerPort: Send + Sync {
    async fn start_execution(&self, request: ExecutionRequest) -> Result<Execution, RsmError>;

    async fn get_execution(&self, execution_id: &str) -> Result<Execution, RsmError>;

    async fn get_node_instance(&self, node_instance_id: &str) -> Result<NodeInstance, RsmError>;

    async fn update_node_instance(
        &self,
        node_instance_id: &str,
        update: NodeInstanceUpdate,
    ) -> Result<NodeInstance, RsmError>;

    async fn list_node_instances(&self, deployment_id: &str)
    -> Result<Vec<NodeInstance>, RsmError>;

    async fn get_node(&self, deployment_id: &str, node_id: &str) -> Result<Node, RsmError>;
}
