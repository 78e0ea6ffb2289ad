//! Persistence collaborators.
//!
//! The tracker never stores anything durably itself. Every add, delete and
//! goal submission goes through a [`PersistEntities`] implementation first and
//! is mirrored into the in-memory store only after it succeeds.

mod http;
mod memory;

pub use http::HttpPersistence;
pub use memory::MemoryPersistence;

use async_trait::async_trait;

use crate::entity::{EntityId, EntityRecord, GoalUpdate};
use crate::error::PersistenceError;

/// Durable storage for entity records.
#[async_trait]
pub trait PersistEntities: Send + Sync {
    /// All records, used to hydrate the store.
    async fn list(&self) -> Result<Vec<EntityRecord>, PersistenceError>;

    /// Create a record and return it with its assigned id.
    async fn create(&self, name: &str) -> Result<EntityRecord, PersistenceError>;

    /// Store the goal and priority for `id`.
    async fn update(&self, id: EntityId, update: &GoalUpdate) -> Result<(), PersistenceError>;

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError>;
}
