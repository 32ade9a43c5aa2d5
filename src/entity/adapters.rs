use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    entity::types::{Entity, PropertyBag},
    error::RsmError,
    manager::{ports::ManagerPort, types::Node},
};

/// Node instance as handed over by the running workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNodeInstance {
    pub id: String,
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub type_hierarchy: Vec<String>,
    #[serde(default)]
    pub properties: PropertyBag,
    #[serde(default)]
    pub runtime_properties: PropertyBag,
}

/// Entity set of the current workflow: the root deployment and its node
/// instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub deployment_id: String,
    #[serde(default)]
    pub node_instances: Vec<WorkflowNodeInstance>,
}

impl WorkflowContext {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read entities file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse entities file {}", path.display()))
    }
}

pub fn entities_from_workflow(context: &WorkflowContext) -> Result<Vec<Entity>, RsmError> {
    context
        .node_instances
        .iter()
        .map(|instance| {
            Entity::new(
                instance.id.clone(),
                instance
                    .deployment_id
                    .clone()
                    .unwrap_or_else(|| context.deployment_id.clone()),
                &instance.type_hierarchy,
                instance.properties.clone(),
                instance.runtime_properties.clone(),
            )
        })
        .collect()
}

/// Lists every node instance of `deployment_id` and joins it with its node.
/// Instances of the same node share one node lookup.
pub async fn entities_from_deployment(
    manager: &dyn ManagerPort,
    deployment_id: &str,
) -> Result<Vec<Entity>, RsmError> {
    let instances = manager.list_node_instances(deployment_id).await?;
    let mut nodes: BTreeMap<String, Node> = BTreeMap::new();
    let mut entities = Vec::with_capacity(instances.len());

    for instance in instances {
        if !nodes.contains_key(&instance.node_id) {
            let node = manager.get_node(deployment_id, &instance.node_id).await?;
            nodes.insert(instance.node_id.clone(), node);
        }
        let Some(node) = nodes.get(&instance.node_id) else {
            continue;
        };

        entities.push(Entity::new(
            instance.id,
            instance.deployment_id,
            &node.type_hierarchy,
            node.properties.clone(),
            instance.runtime_properties,
        )?);
    }

    tracing::debug!(
        target: "rsm.manager",
        deployment_id = %deployment_id,
        entities = entities.len(),
        nodes = nodes.len(),
        "deployment_entities_loaded"
    );
    Ok(entities)
}
