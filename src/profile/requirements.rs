use std::fmt;

use serde_json::{Map, Value};

use crate::{
    error::{RsmError, invalid_profile},
    resources::key::{ResourceKey, Scope},
};

/// Declared minimum availabilities, keyed without a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcesProfile {
    requirements: Vec<(ResourceKey, f64)>,
}

impl ResourcesProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{scope: {system: {resource: requirement}}}` from JSON text.
    pub fn parse(text: &str) -> Result<Self, RsmError> {
        let value: Value = json5::from_str(text)
            .map_err(|err| invalid_profile(format!("profile is not valid JSON: {}", err)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, RsmError> {
        let scopes = as_mapping(value, "profile")?;
        let mut profile = Self::new();

        for (scope_name, systems) in scopes {
            let systems = as_mapping(systems, &format!("scope '{}'", scope_name))?;
            for (system_name, resources) in systems {
                let resources = as_mapping(
                    resources,
                    &format!("system '{}' in scope '{}'", system_name, scope_name),
                )?;
                for (resource_name, requirement) in resources {
                    profile.add_requirement(scope_name, system_name, resource_name, requirement);
                }
            }
        }

        tracing::debug!(
            target: "rsm.profile",
            requirements = profile.len(),
            "profile_parsed"
        );
        Ok(profile)
    }

    /// Unknown scopes and non-numeric values are dropped with a warning. A
    /// requirement whose system and resource repeat an earlier one replaces
    /// it, whatever its scope.
    pub fn add_requirement(
        &mut self,
        scope: &str,
        system_name: &str,
        resource_name: &str,
        requirement: &Value,
    ) -> bool {
        let Some(scope) = Scope::parse_strict(scope) else {
            tracing::warn!(
                target: "rsm.profile",
                scope = %scope,
                "invalid_requirement_scope"
            );
            return false;
        };

        let Some(requirement) = numeric_value(requirement) else {
            tracing::warn!(
                target: "rsm.profile",
                system_name = %system_name,
                resource_name = %resource_name,
                value = %requirement,
                "invalid_requirement_value"
            );
            return false;
        };

        let key = ResourceKey::new(scope, system_name, resource_name, None);
        self.requirements.retain(|(existing, _)| existing != &key);
        self.requirements.push((key, requirement));
        true
    }

    pub fn requirements(&self) -> &[(ResourceKey, f64)] {
        &self.requirements
    }

    pub fn get(&self, key: &ResourceKey) -> Option<f64> {
        self.requirements
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, requirement)| *requirement)
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl fmt::Display for ResourcesProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, requirement) in &self.requirements {
            writeln!(f, "* {}: {}", key, requirement)?;
        }
        Ok(())
    }
}

fn as_mapping<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>, RsmError> {
    value.as_object().ok_or_else(|| {
        invalid_profile(format!(
            "{} must be a mapping, got {}",
            context,
            type_name(value)
        ))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Numbers and numeric strings; booleans do not count.
pub(crate) fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
