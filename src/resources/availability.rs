use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{RsmError, accounting_violation},
    resources::key::ResourceKey,
};

/// A usage or quota reading. Collections count as their number of items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Value(f64),
    Items(usize),
}

impl Amount {
    pub fn as_f64(self) -> f64 {
        match self {
            Amount::Value(value) => value,
            Amount::Items(count) => count as f64,
        }
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceAvailability {
    quota: Option<f64>,
    usage: Option<f64>,
    availability: Option<f64>,
}

impl ResourceAvailability {
    pub fn new(quota: Option<f64>, usage: Option<Amount>) -> Result<Self, RsmError> {
        let mut availability = Self::default();
        availability.update(quota, usage)?;
        Ok(availability)
    }

    pub fn quota(&self) -> Option<f64> {
        self.quota
    }

    pub fn usage(&self) -> Option<f64> {
        self.usage
    }

    pub fn availability(&self) -> Option<f64> {
        self.availability
    }

    /// Overwrites whichever of quota/usage is supplied and recomputes
    /// availability once both are known and the quota is non-negative.
    /// Nothing is committed when the recomputed availability is negative.
    pub fn update(&mut self, quota: Option<f64>, usage: Option<Amount>) -> Result<(), RsmError> {
        let quota = quota.or(self.quota);
        let usage = usage.map(Amount::as_f64).or(self.usage);

        let availability = match (quota, usage) {
            (Some(quota), Some(usage)) if quota >= 0.0 => {
                let computed = quota - usage;
                if computed < 0.0 {
                    return Err(accounting_violation(format!(
                        "resource availability cannot be lower than 0 \
                         (calculated {} for quota={} and usage={})",
                        computed, quota, usage
                    )));
                }
                Some(computed)
            }
            _ => self.availability,
        };

        self.quota = quota;
        self.usage = usage;
        self.availability = availability;
        Ok(())
    }
}

impl fmt::Display for ResourceAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |value| value.to_string())
        }
        write!(
            f,
            "(Q: {}, U: {}, A: {})",
            show(self.quota),
            show(self.usage),
            show(self.availability)
        )
    }
}

/// Accumulation map of one engine run.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityLedger {
    entries: BTreeMap<ResourceKey, ResourceAvailability>,
}

impl AvailabilityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// First write for a key creates the entry, later writes update it in
    /// place and keep the side that was not supplied.
    pub fn record(
        &mut self,
        key: ResourceKey,
        quota: Option<f64>,
        usage: Option<Amount>,
    ) -> Result<(), RsmError> {
        match self.entries.get_mut(&key) {
            Some(existing) => existing.update(quota, usage),
            None => {
                let created = ResourceAvailability::new(quota, usage)?;
                self.entries.insert(key, created);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceAvailability> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKey, &ResourceAvailability)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{project: {system: {resource: {quota, usage, availability}}}}`
    pub fn tree(&self) -> Value {
        let mut root = Map::new();
        for (key, availability) in &self.entries {
            let project = key.project_id().unwrap_or(key.scope().as_str());
            let systems = root
                .entry(project.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(systems) = systems else {
                continue;
            };
            let resources = systems
                .entry(key.system_name().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(resources) = resources else {
                continue;
            };
            resources.insert(
                key.resource_name().to_string(),
                serde_json::to_value(availability).unwrap_or(Value::Null),
            );
        }
        Value::Object(root)
    }
}
