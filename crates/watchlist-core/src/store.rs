//! In-memory entity store.
//!
//! Holds entities in insertion order. No ordering or timing logic lives here;
//! the [`crate::ordering`] policy and the escalation scheduler build on top.

use indexmap::IndexMap;

use crate::entity::{Entity, EntityId};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: IndexMap<EntityId, Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot in insertion order.
    pub fn list(&self) -> Vec<Entity> {
        self.entities.values().cloned().collect()
    }

    /// Insert or replace. A replaced entity keeps its original position.
    pub fn upsert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    /// Remove and return the entity, preserving the order of the rest.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.shift_remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Result<&Entity> {
        self.entities.get(&id).ok_or(CoreError::not_found(id))
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Replace the whole contents, keeping the given order.
    pub fn replace_all(&mut self, entities: impl IntoIterator<Item = Entity>) {
        self.entities = entities.into_iter().map(|e| (e.id, e)).collect();
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
