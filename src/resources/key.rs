use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

pub const SCOPE_GLOBAL: &str = "global";
pub const SCOPE_PROJECT: &str = "project";

/// Project that owns the entities of the root deployment and every
/// global-scoped requirement.
pub const GLOBAL_PROJECT: &str = SCOPE_GLOBAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Project,
}

impl Scope {
    /// Anything other than `global` is a project scope.
    pub fn normalize(value: &str) -> Self {
        if value == SCOPE_GLOBAL {
            Scope::Global
        } else {
            Scope::Project
        }
    }

    /// Strict variant used by the profile parser, which drops unknown scopes.
    pub fn parse_strict(value: &str) -> Option<Self> {
        match value {
            SCOPE_GLOBAL => Some(Scope::Global),
            SCOPE_PROJECT => Some(Scope::Project),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => SCOPE_GLOBAL,
            Scope::Project => SCOPE_PROJECT,
        }
    }
}

/// Identity of an accumulated or required resource.
///
/// Equality, hashing and ordering only look at
/// `(project_id, system_name, resource_name)`; `scope` rides along as
/// information for rebinding and reporting.
#[derive(Debug, Clone)]
pub struct ResourceKey {
    scope: Scope,
    system_name: String,
    resource_name: String,
    project_id: Option<String>,
}

impl ResourceKey {
    pub fn new(
        scope: Scope,
        system_name: impl Into<String>,
        resource_name: impl Into<String>,
        project_id: Option<String>,
    ) -> Self {
        Self {
            scope,
            system_name: system_name.into(),
            resource_name: resource_name.into(),
            project_id,
        }
    }

    /// Key for a value collected while traversing `project`. Entities of the
    /// global project produce global-scoped keys.
    pub fn for_project(
        project: &str,
        system_name: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        Self::new(
            Scope::normalize(project),
            system_name,
            resource_name,
            Some(project.to_string()),
        )
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Rebinds a requirement key to the project it is validated for.
    /// Global-scoped keys always land on [`GLOBAL_PROJECT`].
    pub fn bind_to_project(&self, project_id: &str) -> Self {
        let project = match self.scope {
            Scope::Project => project_id,
            Scope::Global => GLOBAL_PROJECT,
        };
        Self {
            scope: self.scope,
            system_name: self.system_name.clone(),
            resource_name: self.resource_name.clone(),
            project_id: Some(project.to_string()),
        }
    }

    fn identity(&self) -> (Option<&str>, &str, &str) {
        (
            self.project_id.as_deref(),
            self.system_name.as_str(),
            self.resource_name.as_str(),
        )
    }
}

impl PartialEq for ResourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ResourceKey {}

impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for ResourceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.project_id {
            Some(project_id) => write!(
                f,
                "[{}, {}, {}]",
                project_id, self.system_name, self.resource_name
            ),
            None => write!(
                f,
                "[<{}>, {}, {}]",
                self.scope.as_str(),
                self.system_name,
                self.resource_name
            ),
        }
    }
}
