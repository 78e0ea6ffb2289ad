//! In-process persistence used for offline sessions and tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;

use super::PersistEntities;
use crate::entity::{EntityId, EntityRecord, GoalUpdate};
use crate::error::PersistenceError;

#[derive(Debug, Clone)]
struct StoredRecord {
    name: String,
    goal: Option<GoalUpdate>,
}

#[derive(Debug, Default)]
struct Records {
    by_id: IndexMap<EntityId, StoredRecord>,
    next_id: u64,
}

/// Keeps records in memory and assigns sequential ids starting at 1.
///
/// `set_failing(true)` makes every call fail with
/// [`PersistenceError::Rejected`], which is how tests exercise the
/// collaborator-failure paths.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: Mutex<Records>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with one record per name.
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let this = Self::new();
        {
            let mut records = this.records();
            for name in names {
                insert(&mut records, name.into());
            }
        }
        this
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of collaborator calls received so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Last goal stored for `id`.
    pub fn stored_goal(&self, id: EntityId) -> Option<GoalUpdate> {
        self.records().by_id.get(&id).and_then(|r| r.goal.clone())
    }

    pub fn len(&self) -> usize {
        self.records().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().by_id.is_empty()
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, op: &str) -> Result<(), PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected(format!("{op} unavailable")));
        }
        Ok(())
    }
}

fn insert(records: &mut Records, name: String) -> EntityRecord {
    records.next_id += 1;
    let id = EntityId(records.next_id);
    records.by_id.insert(
        id,
        StoredRecord {
            name: name.clone(),
            goal: None,
        },
    );
    EntityRecord { id, name }
}

fn missing(id: EntityId) -> PersistenceError {
    PersistenceError::Rejected(format!("no record with id {id}"))
}

#[async_trait]
impl PersistEntities for MemoryPersistence {
    async fn list(&self) -> Result<Vec<EntityRecord>, PersistenceError> {
        self.begin("list")?;
        Ok(self
            .records()
            .by_id
            .iter()
            .map(|(id, r)| EntityRecord {
                id: *id,
                name: r.name.clone(),
            })
            .collect())
    }

    async fn create(&self, name: &str) -> Result<EntityRecord, PersistenceError> {
        self.begin("create")?;
        Ok(insert(&mut self.records(), name.to_string()))
    }

    async fn update(&self, id: EntityId, update: &GoalUpdate) -> Result<(), PersistenceError> {
        self.begin("update")?;
        let mut records = self.records();
        let record = records.by_id.get_mut(&id).ok_or_else(|| missing(id))?;
        record.goal = Some(update.clone());
        Ok(())
    }

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError> {
        self.begin("delete")?;
        self.records()
            .by_id
            .shift_remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Priority;

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = MemoryPersistence::with_names(["A", "B"]);
        let created = store.create("C").await.unwrap();
        assert_eq!(created.id, EntityId(3));

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn update_and_delete_unknown_ids_fail() {
        let store = MemoryPersistence::new();
        let update = GoalUpdate {
            goal: "x".into(),
            priority: Priority::High,
        };
        assert!(store.update(EntityId(1), &update).await.is_err());
        assert!(store.delete(EntityId(1)).await.is_err());
    }

    #[tokio::test]
    async fn stores_goal() {
        let store = MemoryPersistence::with_names(["A"]);
        let update = GoalUpdate {
            goal: "read".into(),
            priority: Priority::Medium,
        };
        store.update(EntityId(1), &update).await.unwrap();
        assert_eq!(store.stored_goal(EntityId(1)), Some(update));
    }

    #[tokio::test]
    async fn failing_mode_rejects_and_counts() {
        let store = MemoryPersistence::with_names(["A"]);
        store.set_failing(true);
        assert!(matches!(
            store.list().await,
            Err(PersistenceError::Rejected(_))
        ));
        assert!(store.delete(EntityId(1)).await.is_err());
        assert_eq!(store.calls(), 2);
        assert_eq!(store.len(), 1);

        store.set_failing(false);
        store.delete(EntityId(1)).await.unwrap();
        assert!(store.is_empty());
    }
}
