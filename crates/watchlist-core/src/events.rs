use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Priority};

/// Every state change in the tracker produces an Event.
/// UI collaborators subscribe and re-read the ordered list when one arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    EntitiesHydrated {
        count: usize,
        at: DateTime<Utc>,
    },
    EntityAdded {
        id: EntityId,
        name: String,
        at: DateTime<Utc>,
    },
    EntityRemoved {
        id: EntityId,
        at: DateTime<Utc>,
    },
    /// Goal stored and countdown armed.
    GoalSubmitted {
        id: EntityId,
        priority: Priority,
        deadline: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    ExpandToggled {
        id: EntityId,
        expanded: bool,
        at: DateTime<Utc>,
    },
    /// Countdown expired. The display order must be recomputed.
    EntityEscalated {
        id: EntityId,
        escalated_at: DateTime<Utc>,
    },
    EntitiesReset {
        cancelled_countdowns: usize,
        at: DateTime<Utc>,
    },
}
