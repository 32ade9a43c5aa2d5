use serde::Serialize;

use crate::{
    entity::types::Entity,
    error::{RsmError, invalid_state},
    resources::key::GLOBAL_PROJECT,
};

/// Stable handle into the worklist arena. Growth never invalidates it.
pub type EntityIndex = usize;

#[derive(Debug, Clone)]
struct ProjectBucket {
    name: String,
    members: Vec<EntityIndex>,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    entity: EntityIndex,
    project: usize,
    visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectBacklog {
    pub project: String,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorklistDump {
    pub total: usize,
    pub current: usize,
    pub left: Vec<ProjectBacklog>,
    pub processed: Vec<String>,
    pub to_be_processed: Vec<String>,
}

/// Project-partitioned traversal queue.
///
/// Entities live in an append-only arena; `slots` is the operational list of
/// one pass and is rebuilt from the project buckets on every [`reset`].
///
/// [`reset`]: Worklist::reset
#[derive(Debug, Clone)]
pub struct Worklist {
    entities: Vec<Entity>,
    projects: Vec<ProjectBucket>,
    slots: Vec<Slot>,
    cursor: Option<usize>,
}

impl Worklist {
    /// Seeds the global project and positions on its first entity.
    pub fn new(entities: Vec<Entity>) -> Self {
        let mut worklist = Self {
            entities: Vec::new(),
            projects: Vec::new(),
            slots: Vec::new(),
            cursor: None,
        };
        worklist.register_bucket(GLOBAL_PROJECT, entities);
        worklist.reset();
        worklist
    }

    pub fn reset(&mut self) -> Option<EntityIndex> {
        self.slots = self
            .projects
            .iter()
            .enumerate()
            .flat_map(|(project, bucket)| {
                bucket.members.iter().map(move |&entity| Slot {
                    entity,
                    project,
                    visited: false,
                })
            })
            .collect();
        self.cursor = None;
        self.next()
    }

    pub fn next(&mut self) -> Option<EntityIndex> {
        loop {
            // After exhaustion the cursor rests on `len`; a project appended
            // since then starts exactly there.
            let position = match self.cursor {
                None => 0,
                Some(cursor) if self.slots.get(cursor).is_some_and(|slot| !slot.visited) => cursor,
                Some(cursor) => cursor + 1,
            };
            if position >= self.slots.len() {
                self.cursor = Some(self.slots.len());
                tracing::debug!(
                    target: "rsm.worklist",
                    total = self.slots.len(),
                    "no_entities_left"
                );
                return None;
            }

            self.cursor = Some(position);
            let slot = &mut self.slots[position];
            if slot.visited {
                continue;
            }
            slot.visited = true;
            return Some(slot.entity);
        }
    }

    /// Registers a discovered project behind every known bucket. A name that
    /// is already registered is left alone and `false` is returned.
    pub fn add_project(&mut self, name: &str, entities: Vec<Entity>) -> bool {
        if self.projects.iter().any(|bucket| bucket.name == name) {
            tracing::warn!(
                target: "rsm.worklist",
                project = %name,
                "project_already_registered"
            );
            return false;
        }

        let project = self.register_bucket(name, entities);
        let bucket = &self.projects[project];
        self.slots.extend(bucket.members.iter().map(|&entity| Slot {
            entity,
            project,
            visited: false,
        }));
        true
    }

    pub fn current_index(&self) -> Result<EntityIndex, RsmError> {
        self.current_slot().map(|slot| slot.entity)
    }

    pub fn current(&self) -> Result<&Entity, RsmError> {
        let index = self.current_index()?;
        Ok(&self.entities[index])
    }

    pub fn current_mut(&mut self) -> Result<&mut Entity, RsmError> {
        let index = self.current_index()?;
        Ok(&mut self.entities[index])
    }

    pub fn current_project(&self) -> Result<&str, RsmError> {
        let slot = self.current_slot()?;
        Ok(self.projects[slot.project].name.as_str())
    }

    pub fn entity(&self, index: EntityIndex) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(|bucket| bucket.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn backlog(&self) -> Vec<ProjectBacklog> {
        let mut left: Vec<ProjectBacklog> = self
            .projects
            .iter()
            .map(|bucket| ProjectBacklog {
                project: bucket.name.clone(),
                pending: 0,
            })
            .collect();
        for slot in self.slots.iter().filter(|slot| !slot.visited) {
            left[slot.project].pending += 1;
        }
        left
    }

    pub fn dump(&self) -> WorklistDump {
        let ids = |visited: bool| {
            self.slots
                .iter()
                .filter(|slot| slot.visited == visited)
                .map(|slot| self.entities[slot.entity].id().to_string())
                .collect::<Vec<_>>()
        };

        WorklistDump {
            total: self.slots.len(),
            current: self.cursor.map_or(0, |cursor| cursor + 1),
            left: self.backlog(),
            processed: ids(true),
            to_be_processed: ids(false),
        }
    }

    fn current_slot(&self) -> Result<&Slot, RsmError> {
        let Some(position) = self.cursor else {
            return Err(invalid_state(
                "worklist has not been advanced yet - there is no current entity",
            ));
        };

        self.slots.get(position).ok_or_else(|| {
            invalid_state(format!(
                "unexpected worklist state - there are {} entities, but the cursor points at entity number {}",
                self.slots.len(),
                position + 1
            ))
        })
    }

    fn register_bucket(&mut self, name: &str, entities: Vec<Entity>) -> usize {
        let first = self.entities.len();
        self.entities.extend(entities);
        self.projects.push(ProjectBucket {
            name: name.to_string(),
            members: (first..self.entities.len()).collect(),
        });
        self.projects.len() - 1
    }
}
