//! Tracked entities and their priority tiers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier assigned by the persistence collaborator. Never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EntityId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(EntityId)
            .map_err(|e| ValidationError::InvalidValue {
                field: "id".into(),
                message: format!("'{s}' is not a valid id: {e}"),
            })
    }
}

/// Priority tier. Selects the countdown length when a goal is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl Priority {
    pub const HIGH_MS: u64 = 300_000;
    pub const MEDIUM_MS: u64 = 600_000;
    pub const LOW_MS: u64 = 1_200_000;

    /// Countdown length in milliseconds.
    pub const fn duration_ms(self) -> u64 {
        match self {
            Priority::High => Self::HIGH_MS,
            Priority::Medium => Self::MEDIUM_MS,
            Priority::Low => Self::LOW_MS,
        }
    }

    pub const fn duration(self) -> Duration {
        Duration::from_millis(self.duration_ms())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    /// An empty string means "not chosen" and falls back to `Low`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" | "" => Ok(Priority::Low),
            other => Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("expected high, medium or low, got '{other}'"),
            }),
        }
    }
}

/// Minimal record returned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: String,
}

impl EntityRecord {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            name: name.into(),
        }
    }
}

/// Payload durably stored by `submit_goal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalUpdate {
    pub goal: String,
    pub priority: Priority,
}

/// A tracked subject awaiting periodic check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// Empty means no active goal.
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub priority: Priority,
    /// Countdown expired and has not been reset or silenced since.
    #[serde(default)]
    pub alerted: bool,
    /// Expiry moment of the countdown that escalated this entity.
    /// Survives `toggle_expand` so the entity keeps its queue position.
    #[serde(default)]
    pub escalated_at: Option<DateTime<Utc>>,
    /// UI visibility flag.
    #[serde(default)]
    pub expanded: bool,
}

impl Entity {
    pub fn is_escalated(&self) -> bool {
        self.escalated_at.is_some()
    }

    pub fn has_goal(&self) -> bool {
        !self.goal.is_empty()
    }

    /// Back to the state of a freshly ingested record, keeping id and name.
    pub fn clear_scheduling(&mut self) {
        self.goal.clear();
        self.priority = Priority::Low;
        self.alerted = false;
        self.escalated_at = None;
        self.expanded = false;
    }
}

impl From<EntityRecord> for Entity {
    fn from(record: EntityRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            goal: String::new(),
            priority: Priority::Low,
            alerted: false,
            escalated_at: None,
            expanded: false,
        }
    }
}
