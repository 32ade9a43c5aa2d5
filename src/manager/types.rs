use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::types::PropertyBag;

pub const WORKFLOW_EXECUTE_OPERATION: &str = "execute_operation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub deployment_id: String,
    pub workflow_id: String,
    pub parameters: Value,
    pub allow_custom_parameters: bool,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: String,
    pub node_id: String,
    pub deployment_id: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub runtime_properties: PropertyBag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub deployment_id: String,
    #[serde(default)]
    pub type_hierarchy: Vec<String>,
    #[serde(default)]
    pub properties: PropertyBag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstanceUpdate {
    pub runtime_properties: PropertyBag,
    pub version: u64,
}
