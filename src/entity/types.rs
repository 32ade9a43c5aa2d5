use serde_json::{Map, Value};

use crate::{
    error::{RsmError, invalid_entity},
    resources::key::Scope,
};

pub type PropertyBag = Map<String, Value>;

pub const NODE_TYPE_ROOT: &str = "cloudify.nodes.Root";
pub const NODE_TYPE_PROJECT: &str = "cloudify.nodes.resource_management.Project";
pub const NODE_TYPE_QUOTA: &str = "cloudify.nodes.resource_management.Quota";
pub const NODE_TYPE_USAGE: &str = "cloudify.nodes.resource_management.Usage";
pub const NODE_TYPE_RESULT: &str = "cloudify.nodes.resource_management.Result";

const RESOURCE_MANAGEMENT_TYPES: [&str; 4] = [
    NODE_TYPE_PROJECT,
    NODE_TYPE_QUOTA,
    NODE_TYPE_USAGE,
    NODE_TYPE_RESULT,
];

pub const PROPERTY_DEPLOYMENT_ID: &str = "deployment_id";
pub const PROPERTY_OPERATION_INPUTS: &str = "operation_inputs";
pub const PROPERTY_PROJECT_NAME: &str = "project_name";
pub const PROPERTY_RESOURCE_NAME: &str = "resource_name";
pub const PROPERTY_RUNTIME_PROPERTY_NAME: &str = "runtime_property_name";
pub const PROPERTY_SCOPE: &str = "scope";
pub const PROPERTY_SYSTEM_NAME: &str = "system_name";

/// Normalized resource-bearing node instance, independent of whether it came
/// from the running workflow or from a deployment query.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: String,
    deployment_id: String,
    entity_type: Option<String>,
    system_name: Option<String>,
    resource_name: Option<String>,
    scope: Scope,
    runtime_property_name: Option<String>,
    properties: PropertyBag,
    runtime_properties: PropertyBag,
    execution_id: Option<String>,
}

impl Entity {
    pub fn new(
        id: impl Into<String>,
        deployment_id: impl Into<String>,
        type_hierarchy: &[String],
        properties: PropertyBag,
        runtime_properties: PropertyBag,
    ) -> Result<Self, RsmError> {
        let id = id.into();
        let entity_type = normalized_type(type_hierarchy);
        let strict = entity_type
            .as_deref()
            .is_some_and(|entity_type| RESOURCE_MANAGEMENT_TYPES.contains(&entity_type));

        let system_name = declared_string(&id, &properties, PROPERTY_SYSTEM_NAME, strict)?;
        let resource_name = declared_string(&id, &properties, PROPERTY_RESOURCE_NAME, strict)?;
        let runtime_property_name =
            declared_string(&id, &properties, PROPERTY_RUNTIME_PROPERTY_NAME, strict)?;

        Ok(Self {
            scope: declared_scope(&id, &properties),
            entity_type,
            deployment_id: deployment_id.into(),
            system_name,
            resource_name,
            runtime_property_name,
            properties,
            runtime_properties,
            execution_id: None,
            id,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn system_name(&self) -> Option<&str> {
        self.system_name.as_deref()
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.resource_name.as_deref()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn runtime_property_name(&self) -> Option<&str> {
        self.runtime_property_name.as_deref()
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn runtime_properties(&self) -> &PropertyBag {
        &self.runtime_properties
    }

    pub fn set_runtime_properties(&mut self, runtime_properties: PropertyBag) {
        self.runtime_properties = runtime_properties;
    }

    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// Inputs for the remote usage operation. Absent means none; anything
    /// other than a mapping is a malformed entity.
    pub fn operation_inputs(&self) -> Result<PropertyBag, RsmError> {
        match self.properties.get(PROPERTY_OPERATION_INPUTS) {
            None | Some(Value::Null) => Ok(PropertyBag::new()),
            Some(Value::Object(inputs)) => Ok(inputs.clone()),
            Some(other) => Err(invalid_entity(format!(
                "property '{}' of entity '{}' must be a mapping, got {}",
                PROPERTY_OPERATION_INPUTS, self.id, other
            ))),
        }
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    pub fn set_execution_id(&mut self, execution_id: impl Into<String>) {
        self.execution_id = Some(execution_id.into());
    }

    pub fn take_execution_id(&mut self) -> Option<String> {
        self.execution_id.take()
    }

    pub fn is_of_type(&self, entity_type: &str) -> bool {
        self.entity_type.as_deref() == Some(entity_type)
    }
}

fn normalized_type(type_hierarchy: &[String]) -> Option<String> {
    type_hierarchy
        .iter()
        .find(|entry| entry.as_str() != NODE_TYPE_ROOT)
        .cloned()
}

/// A declared property that must be a string. Resource-management types fail
/// on anything else; other nodes only reach the no-op handler, so the value
/// is dropped with a warning.
fn declared_string(
    entity_id: &str,
    properties: &PropertyBag,
    name: &str,
    strict: bool,
) -> Result<Option<String>, RsmError> {
    match properties.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) if strict => Err(invalid_entity(format!(
            "property '{}' of entity '{}' must be a string, got {}",
            name, entity_id, other
        ))),
        Some(other) => {
            tracing::warn!(
                target: "rsm.worklist",
                entity_id = %entity_id,
                property = name,
                value = %other,
                "declared_property_ignored"
            );
            Ok(None)
        }
    }
}

fn declared_scope(entity_id: &str, properties: &PropertyBag) -> Scope {
    match properties.get(PROPERTY_SCOPE) {
        None | Some(Value::Null) => Scope::Project,
        Some(Value::String(value)) => Scope::normalize(value),
        Some(other) => {
            tracing::warn!(
                target: "rsm.worklist",
                entity_id = %entity_id,
                value = %other,
                "scope_not_a_string"
            );
            Scope::Project
        }
    }
}
