use std::fmt;

use serde::Serialize;

use crate::{
    profile::requirements::ResourcesProfile,
    resources::{availability::AvailabilityLedger, key::ResourceKey},
};

/// Business outcome of checking one requirement. These are returned as
/// data; escalating them is the caller's decision.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileValidationError {
    CannotDetermineAvailability {
        key: ResourceKey,
        requirement: f64,
    },
    NoAvailableResources {
        key: ResourceKey,
        requirement: f64,
        availability: f64,
    },
}

impl ProfileValidationError {
    pub fn key(&self) -> &ResourceKey {
        match self {
            Self::CannotDetermineAvailability { key, .. }
            | Self::NoAvailableResources { key, .. } => key,
        }
    }

    pub fn requirement(&self) -> f64 {
        match self {
            Self::CannotDetermineAvailability { requirement, .. }
            | Self::NoAvailableResources { requirement, .. } => *requirement,
        }
    }

    pub fn availability(&self) -> Option<f64> {
        match self {
            Self::CannotDetermineAvailability { .. } => None,
            Self::NoAvailableResources { availability, .. } => Some(*availability),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::CannotDetermineAvailability { key, requirement } => format!(
                "Cannot validate profile requirement ({}={}) for resource: {}/{} in project: {}. \
                 Availability for this resource is not calculated.",
                key.resource_name(),
                requirement,
                key.system_name(),
                key.resource_name(),
                key.project_id().unwrap_or(key.scope().as_str()),
            ),
            Self::NoAvailableResources {
                key,
                requirement,
                availability,
            } => format!(
                "Profile requirement not met for resource: {}/{} in project: {}. \
                 Requirement is {}={}, but only {} is available",
                key.system_name(),
                key.resource_name(),
                key.project_id().unwrap_or(key.scope().as_str()),
                key.resource_name(),
                requirement,
                availability,
            ),
        }
    }
}

impl fmt::Display for ProfileValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl Serialize for ProfileValidationError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.message())
    }
}

impl ResourcesProfile {
    /// Checks every requirement against the ledger for `project_id`.
    /// Global requirements are looked up under the global project.
    pub fn validate(
        &self,
        ledger: &AvailabilityLedger,
        project_id: &str,
    ) -> Vec<ProfileValidationError> {
        tracing::info!(
            target: "rsm.profile",
            project_id = %project_id,
            requirements = self.len(),
            "profile_validation_started"
        );

        let mut errors = Vec::new();
        for (key, requirement) in self.requirements() {
            let key = key.bind_to_project(project_id);
            let entry = ledger.get(&key);
            tracing::debug!(
                target: "rsm.profile",
                key = %key,
                availability = ?entry.map(ToString::to_string),
                "requirement_checked"
            );

            let Some(availability) = entry.and_then(|entry| entry.availability()) else {
                errors.push(ProfileValidationError::CannotDetermineAvailability {
                    key,
                    requirement: *requirement,
                });
                continue;
            };

            if *requirement > availability {
                errors.push(ProfileValidationError::NoAvailableResources {
                    key,
                    requirement: *requirement,
                    availability,
                });
            }
        }
        errors
    }
}
