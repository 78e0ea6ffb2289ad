//! Update orchestration.
//!
//! [`Orchestrator`] is the single entry point for the UI collaborator. It owns
//! the entity store and the escalation scheduler behind one mutex, so a
//! countdown expiry and a foreground update to the same entity are always
//! serialized. Persistence calls are awaited with the lock released; their
//! outcome is applied afterwards in one short critical section.
//!
//! ## Concurrent reset and goal submission
//!
//! Last write wins: a `submit_goal` whose collaborator call was in flight when
//! `reset_all` ran is applied after the reset and arms a fresh countdown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::entity::{Entity, EntityId, GoalUpdate, Priority};
use crate::error::{CoreError, Result, ValidationError};
use crate::escalation::{Clock, CountdownInfo, EscalationScheduler, Expiry, SystemClock};
use crate::events::Event;
use crate::ordering;
use crate::persistence::PersistEntities;
use crate::store::EntityStore;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct State {
    store: EntityStore,
    scheduler: EscalationScheduler,
}

struct Shared {
    state: Mutex<State>,
    events: broadcast::Sender<Event>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Arm a countdown whose expiry reaches back into this state.
    fn arm(
        self: &Arc<Self>,
        state: &mut State,
        id: EntityId,
        priority: Priority,
    ) -> DateTime<Utc> {
        let weak = Arc::downgrade(self);
        let armed_at = self.clock.now();
        state.scheduler.arm(id, priority, armed_at, move |expiry| {
            if let Some(shared) = weak.upgrade() {
                shared.expire(expiry);
            }
        })
    }

    /// Countdown callback. Never fails upward: stale or orphaned expiries are
    /// logged and dropped.
    fn expire(&self, expiry: Expiry) {
        {
            let mut state = self.lock();
            if !state.scheduler.complete(&expiry) {
                debug!(id = %expiry.id, generation = expiry.generation, "discarding stale countdown");
                return;
            }
            let Some(entity) = state.store.get_mut(expiry.id) else {
                debug!(id = %expiry.id, "countdown expired for removed entity");
                return;
            };
            entity.alerted = true;
            entity.escalated_at = Some(expiry.deadline);
        }

        info!(id = %expiry.id, escalated_at = %expiry.deadline, "entity escalated");
        self.emit(Event::EntityEscalated {
            id: expiry.id,
            escalated_at: expiry.deadline,
        });
    }
}

/// Coordinates updates between the UI, persistence, store and scheduler.
///
/// Cloning is cheap and yields a handle to the same tracker.
#[derive(Clone)]
pub struct Orchestrator {
    persistence: Arc<dyn PersistEntities>,
    shared: Arc<Shared>,
}

impl Orchestrator {
    pub fn new(persistence: Arc<dyn PersistEntities>) -> Self {
        Self::with_clock(persistence, Arc::new(SystemClock))
    }

    pub fn with_clock(persistence: Arc<dyn PersistEntities>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            persistence,
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                events,
                clock,
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Entities in display order: escalated first (oldest escalation on top),
    /// then everything else in store order.
    pub fn ordered(&self) -> Vec<Entity> {
        let snapshot = self.shared.lock().store.list();
        ordering::order(snapshot)
    }

    /// Entities in store insertion order.
    pub fn entities(&self) -> Vec<Entity> {
        self.shared.lock().store.list()
    }

    pub fn get(&self, id: EntityId) -> Result<Entity> {
        self.shared.lock().store.get(id).cloned()
    }

    pub fn countdown(&self, id: EntityId) -> Option<CountdownInfo> {
        self.shared.lock().scheduler.countdown(id)
    }

    pub fn pending_countdowns(&self) -> usize {
        self.shared.lock().scheduler.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the store with the collaborator's records.
    ///
    /// Every countdown is cancelled and every entity starts unescalated, low
    /// priority and collapsed.
    pub async fn hydrate(&self) -> Result<usize> {
        let records = self.persistence.list().await.map_err(|e| {
            warn!(error = %e, "failed to load entities");
            e
        })?;

        let (count, cancelled) = {
            let mut state = self.shared.lock();
            let cancelled = state.scheduler.cancel_all();
            state.store.replace_all(records.into_iter().map(Entity::from));
            (state.store.len(), cancelled)
        };

        info!(count, cancelled, "entities hydrated");
        self.shared.emit(Event::EntitiesHydrated {
            count,
            at: self.shared.clock.now(),
        });
        Ok(count)
    }

    /// Store a new goal and restart the entity's countdown.
    ///
    /// A goal of only whitespace counts as empty and is rejected with
    /// [`ValidationError::EmptyGoal`] before the collaborator is called.
    pub async fn submit_goal(
        &self,
        id: EntityId,
        goal: impl Into<String>,
        priority: Priority,
    ) -> Result<Entity> {
        let goal = goal.into();
        if goal.trim().is_empty() {
            return Err(ValidationError::EmptyGoal.into());
        }
        self.ensure_exists(id)?;

        let update = GoalUpdate { goal, priority };
        self.persistence.update(id, &update).await.map_err(|e| {
            warn!(%id, error = %e, "goal update rejected");
            e
        })?;

        let (entity, deadline) = {
            let mut guard = self.shared.lock();
            let state = &mut *guard;
            let entity = state.store.get_mut(id).ok_or(CoreError::not_found(id))?;
            entity.goal = update.goal;
            entity.priority = priority;
            entity.expanded = false;
            entity.alerted = false;
            entity.escalated_at = None;
            let snapshot = entity.clone();
            let deadline = self.shared.arm(state, id, priority);
            (snapshot, deadline)
        };

        info!(%id, %priority, %deadline, "goal submitted");
        self.shared.emit(Event::GoalSubmitted {
            id,
            priority,
            deadline,
            at: self.shared.clock.now(),
        });
        Ok(entity)
    }

    /// Flip the expanded flag.
    ///
    /// Expanding an alerted entity silences the alert without resolving the
    /// escalation: `escalated_at` is never touched here, so the entity keeps
    /// its queue position. The scheduler is not involved.
    pub fn toggle_expand(&self, id: EntityId) -> Result<Entity> {
        let entity = {
            let mut state = self.shared.lock();
            let entity = state.store.get_mut(id).ok_or(CoreError::not_found(id))?;
            entity.expanded = !entity.expanded;
            entity.alerted = false;
            entity.clone()
        };

        self.shared.emit(Event::ExpandToggled {
            id,
            expanded: entity.expanded,
            at: self.shared.clock.now(),
        });
        Ok(entity)
    }

    /// Clear every goal, priority and escalation, and cancel all countdowns.
    /// Returns how many countdowns were cancelled.
    pub fn reset_all(&self) -> usize {
        let cancelled = {
            let mut state = self.shared.lock();
            let cancelled = state.scheduler.cancel_all();
            state.store.iter_mut().for_each(Entity::clear_scheduling);
            cancelled
        };

        info!(cancelled, "all entities reset");
        self.shared.emit(Event::EntitiesReset {
            cancelled_countdowns: cancelled,
            at: self.shared.clock.now(),
        });
        cancelled
    }

    /// Create a record through the collaborator and start tracking it.
    pub async fn add_entity(&self, name: &str) -> Result<Entity> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let record = self.persistence.create(name).await.map_err(|e| {
            warn!(error = %e, "entity creation rejected");
            e
        })?;

        let entity = Entity::from(record);
        {
            let mut state = self.shared.lock();
            state.scheduler.cancel(entity.id);
            state.store.upsert(entity.clone());
        }

        info!(id = %entity.id, name = %entity.name, "entity added");
        self.shared.emit(Event::EntityAdded {
            id: entity.id,
            name: entity.name.clone(),
            at: self.shared.clock.now(),
        });
        Ok(entity)
    }

    /// Delete through the collaborator, then forget the entity and cancel its
    /// countdown.
    pub async fn delete_entity(&self, id: EntityId) -> Result<Entity> {
        self.ensure_exists(id)?;

        self.persistence.delete(id).await.map_err(|e| {
            warn!(%id, error = %e, "entity deletion rejected");
            e
        })?;

        let removed = {
            let mut state = self.shared.lock();
            state.scheduler.cancel(id);
            state.store.remove(id)
        };
        let removed = removed.ok_or(CoreError::not_found(id))?;

        info!(%id, "entity removed");
        self.shared.emit(Event::EntityRemoved {
            id,
            at: self.shared.clock.now(),
        });
        Ok(removed)
    }

    /// Cancel every pending countdown without touching entity state.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.shared.lock().scheduler.cancel_all();
        debug!(cancelled, "countdowns cancelled on shutdown");
        cancelled
    }

    fn ensure_exists(&self, id: EntityId) -> Result<()> {
        if self.shared.lock().store.contains(id) {
            Ok(())
        } else {
            Err(CoreError::not_found(id))
        }
    }
}
