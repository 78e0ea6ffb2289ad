//! Per-entity escalation countdowns.
//!
//! Each armed countdown is a tokio task that sleeps for the priority's
//! duration and then hands an [`Expiry`] to the callback it was armed with.
//! The scheduler keeps an explicit handle table (id → countdown) so arming,
//! cancelling, reset and deletion can all abort pending tasks.
//!
//! ## Stale expiries
//!
//! Aborting a task that already woke up does not stop it. Every countdown
//! therefore carries a generation number, and the owner must call
//! [`EscalationScheduler::complete`] under its lock before applying an expiry:
//! only the countdown currently registered for the id is accepted.
//!
//! ```text
//! arm(id) ──sleep(duration)──> on_expiry(Expiry) ──> complete() ? apply : discard
//!    └── cancel(id) / arm(id) again ──> abort + forget generation
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::entity::{EntityId, Priority};

/// Delivered to the expiry callback when a countdown runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub id: EntityId,
    pub generation: u64,
    /// Scheduled expiry moment, recorded as the escalation time.
    pub deadline: DateTime<Utc>,
}

/// Public view of an armed countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownInfo {
    pub priority: Priority,
    pub armed_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug)]
struct Countdown {
    info: CountdownInfo,
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct EscalationScheduler {
    countdowns: HashMap<EntityId, Countdown>,
    next_generation: u64,
}

impl EscalationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any countdown for `id` and start a new one.
    ///
    /// Must be called from within a tokio runtime. Returns the deadline.
    pub fn arm<F>(
        &mut self,
        id: EntityId,
        priority: Priority,
        armed_at: DateTime<Utc>,
        on_expiry: F,
    ) -> DateTime<Utc>
    where
        F: FnOnce(Expiry) + Send + 'static,
    {
        self.cancel(id);

        self.next_generation += 1;
        let generation = self.next_generation;
        let delay = priority.duration();
        let deadline = armed_at
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        let expiry = Expiry {
            id,
            generation,
            deadline,
        };

        // Deadline fixed now, not at the task's first poll.
        let wake_at = tokio::time::Instant::now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(wake_at).await;
            on_expiry(expiry);
        });

        tracing::debug!(%id, %priority, generation, %deadline, "countdown armed");
        self.countdowns.insert(
            id,
            Countdown {
                info: CountdownInfo {
                    priority,
                    armed_at,
                    deadline,
                },
                generation,
                handle,
            },
        );
        deadline
    }

    /// Cancel the pending countdown for `id`. Returns whether one existed.
    pub fn cancel(&mut self, id: EntityId) -> bool {
        match self.countdowns.remove(&id) {
            Some(countdown) => {
                countdown.handle.abort();
                tracing::debug!(%id, generation = countdown.generation, "countdown cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending countdown. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.countdowns.len();
        for (_, countdown) in self.countdowns.drain() {
            countdown.handle.abort();
        }
        count
    }

    /// Retire the countdown that produced `expiry`.
    ///
    /// Returns `false` for a stale expiry (cancelled or superseded), which the
    /// caller must discard.
    pub fn complete(&mut self, expiry: &Expiry) -> bool {
        match self.countdowns.get(&expiry.id) {
            Some(current) if current.generation == expiry.generation => {
                self.countdowns.remove(&expiry.id);
                true
            }
            _ => false,
        }
    }

    pub fn countdown(&self, id: EntityId) -> Option<CountdownInfo> {
        self.countdowns.get(&id).map(|c| c.info)
    }

    pub fn is_armed(&self, id: EntityId) -> bool {
        self.countdowns.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.countdowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countdowns.is_empty()
    }
}

impl Drop for EscalationScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
