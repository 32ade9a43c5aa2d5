use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    entity::types::PropertyBag,
    error::{RsmError, communication_failure},
    manager::{
        ports::ManagerPort,
        types::{Execution, ExecutionRequest, Node, NodeInstance, NodeInstanceUpdate},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerCall {
    StartExecution {
        deployment_id: String,
        node_instance_ids: Vec<String>,
        operation: Option<String>,
    },
    GetExecution {
        execution_id: String,
    },
    GetNodeInstance {
        node_instance_id: String,
    },
    UpdateNodeInstance {
        node_instance_id: String,
        version: u64,
    },
    ListNodeInstances {
        deployment_id: String,
    },
    GetNode {
        deployment_id: String,
        node_id: String,
    },
}

/// Outcome of the remote operation started for one node instance.
#[derive(Debug, Clone)]
pub struct ExecutionScript {
    /// Statuses reported by consecutive checks; the last one repeats. An
    /// empty string is reported as a missing status.
    pub statuses: Vec<String>,
    /// Runtime properties written by the operation once it terminates.
    pub produces: Option<PropertyBag>,
}

impl ExecutionScript {
    pub fn terminated_with(produces: PropertyBag) -> Self {
        Self {
            statuses: vec!["terminated".to_string()],
            produces: Some(produces),
        }
    }

    pub fn statuses(statuses: &[&str]) -> Self {
        Self {
            statuses: statuses.iter().map(|status| status.to_string()).collect(),
            produces: None,
        }
    }

    pub fn producing(mut self, produces: PropertyBag) -> Self {
        self.produces = Some(produces);
        self
    }
}

struct RunningExecution {
    node_instance_id: Option<String>,
    statuses: VecDeque<String>,
    produces: Option<PropertyBag>,
}

#[derive(Default)]
struct ManagerState {
    nodes: BTreeMap<(String, String), Node>,
    node_instances: BTreeMap<String, NodeInstance>,
    deployment_order: Vec<String>,
    scripts: BTreeMap<String, ExecutionScript>,
    executions: BTreeMap<String, RunningExecution>,
    next_execution: u64,
    fail_status_checks: bool,
    calls: Vec<ManagerCall>,
}

/// In-process manager used by tests and dry runs.
#[derive(Default)]
pub struct InMemoryManager {
    state: Mutex<ManagerState>,
}

impl InMemoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: Node) {
        let mut guard = self.state.lock().expect("lock poisoned");
        guard
            .nodes
            .insert((node.deployment_id.clone(), node.id.clone()), node);
    }

    pub fn add_node_instance(&self, instance: NodeInstance) {
        let mut guard = self.state.lock().expect("lock poisoned");
        guard.deployment_order.push(instance.id.clone());
        guard.node_instances.insert(instance.id.clone(), instance);
    }

    /// Registers a node and a single instance of it in one go.
    pub fn add_entity(
        &self,
        deployment_id: &str,
        instance_id: &str,
        node_type: &str,
        properties: PropertyBag,
        runtime_properties: PropertyBag,
    ) {
        let node_id = format!("{}_node", instance_id);
        self.add_node(Node {
            id: node_id.clone(),
            deployment_id: deployment_id.to_string(),
            type_hierarchy: vec![
                crate::entity::types::NODE_TYPE_ROOT.to_string(),
                node_type.to_string(),
            ],
            properties,
        });
        self.add_node_instance(NodeInstance {
            id: instance_id.to_string(),
            node_id,
            deployment_id: deployment_id.to_string(),
            version: 1,
            runtime_properties,
        });
    }

    pub fn script_execution(&self, node_instance_id: &str, script: ExecutionScript) {
        let mut guard = self.state.lock().expect("lock poisoned");
        guard.scripts.insert(node_instance_id.to_string(), script);
    }

    pub fn fail_status_checks(&self) {
        self.state.lock().expect("lock poisoned").fail_status_checks = true;
    }

    pub fn calls(&self) -> Vec<ManagerCall> {
        self.state.lock().expect("lock poisoned").calls.clone()
    }

    pub fn runtime_properties(&self, node_instance_id: &str) -> Option<PropertyBag> {
        self.state
            .lock()
            .expect("lock poisoned")
            .node_instances
            .get(node_instance_id)
            .map(|instance| instance.runtime_properties.clone())
    }
}

#[async_trait]
impl ManagerPort for InMemoryManager {
    async fn start_execution(&self, request: ExecutionRequest) -> Result<Execution, RsmError> {
        let node_instance_ids: Vec<String> = request
            .parameters
            .get("node_instance_ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let operation = request
            .parameters
            .get("operation")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut guard = self.state.lock().expect("lock poisoned");
        guard.calls.push(ManagerCall::StartExecution {
            deployment_id: request.deployment_id.clone(),
            node_instance_ids: node_instance_ids.clone(),
            operation,
        });

        guard.next_execution += 1;
        let execution_id = format!("exec-{}", guard.next_execution);
        let node_instance_id = node_instance_ids.first().cloned();
        let script = node_instance_id
            .as_ref()
            .and_then(|id| guard.scripts.get(id).cloned())
            .unwrap_or_else(|| ExecutionScript::statuses(&["terminated"]));

        guard.executions.insert(
            execution_id.clone(),
            RunningExecution {
                node_instance_id,
                statuses: script.statuses.into_iter().collect(),
                produces: script.produces,
            },
        );

        Ok(Execution {
            id: execution_id,
            status: Some("pending".to_string()),
            deployment_id: Some(request.deployment_id),
            workflow_id: Some(request.workflow_id),
        })
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution, RsmError> {
        let mut guard = self.state.lock().expect("lock poisoned");
        guard.calls.push(ManagerCall::GetExecution {
            execution_id: execution_id.to_string(),
        });
        if guard.fail_status_checks {
            return Err(communication_failure(format!(
                "connection refused while checking execution {}",
                execution_id
            )));
        }

        let state = &mut *guard;
        let Some(execution) = state.executions.get_mut(execution_id) else {
            return Err(communication_failure(format!(
                "manager request 'get_execution' returned status 404: execution {} not found",
                execution_id
            )));
        };

        let status = if execution.statuses.len() > 1 {
            execution.statuses.pop_front().unwrap_or_default()
        } else {
            execution.statuses.front().cloned().unwrap_or_default()
        };

        if status == "terminated"
            && let Some(produces) = execution.produces.take()
            && let Some(node_instance_id) = &execution.node_instance_id
            && let Some(instance) = state.node_instances.get_mut(node_instance_id)
        {
            instance.runtime_properties.extend(produces);
            instance.version += 1;
        }

        Ok(Execution {
            id: execution_id.to_string(),
            status: (!status.is_empty()).then_some(status),
            deployment_id: None,
            workflow_id: None,
        })
    }

    async fn get_node_instance(&self, node_instance_id: &str) -> Result<NodeInstance, RsmError> {
        let mut guard = self.state.lock().expect("lock poisoned");
        guard.calls.push(ManagerCall::GetNodeInstance {
            node_instance_id: node_instance_id.to_string(),
        });
        guard
            .node_instances
            .get(node_instance_id)
            .cloned()
            .ok_or_else(|| {
                communication_failure(format!("node instance {} not found", node_instance_id))
            })
    }

    async fn update_node_instance(
        &self,
        node_instance_id: &str,
        update: NodeInstanceUpdate,
    ) -> Result<NodeInstance, RsmError> {
        let mut guard = self.state.lock().expect("lock poisoned");
        guard.calls.push(ManagerCall::UpdateNodeInstance {
            node_instance_id: node_instance_id.to_string(),
            version: update.version,
        });
        let instance = guard
            .node_instances
            .get_mut(node_instance_id)
            .ok_or_else(|| {
                communication_failure(format!("node instance {} not found", node_instance_id))
            })?;

        if instance.version != update.version {
            return Err(communication_failure(format!(
                "version conflict on node instance {}: stored={}, offered={}",
                node_instance_id, instance.version, update.version
            )));
        }

        instance.runtime_properties = update.runtime_properties;
        instance.version += 1;
        Ok(instance.clone())
    }

    async fn list_node_instances(
        &self,
        deployment_id: &str,
    ) -> Result<Vec<NodeInstance>, RsmError> {
        let mut guard = self.state.lock().expect("lock poisoned");
        guard.calls.push(ManagerCall::ListNodeInstances {
            deployment_id: deployment_id.to_string(),
        });
        Ok(guard
            .deployment_order
            .iter()
            .filter_map(|id| guard.node_instances.get(id))
            .filter(|instance| instance.deployment_id == deployment_id)
            .cloned()
            .collect())
    }

    async fn get_node(&self, deployment_id: &str, node_id: &str) -> Result<Node, RsmError> {
        let mut guard = self.state.lock().expect("lock poisoned");
        guard.calls.push(ManagerCall::GetNode {
            deployment_id: deployment_id.to_string(),
            node_id: node_id.to_string(),
        });
        guard
            .nodes
            .get(&(deployment_id.to_string(), node_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                communication_failure(format!(
                    "node {} of deployment {} not found",
                    node_id, deployment_id
                ))
            })
    }
}
