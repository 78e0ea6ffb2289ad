//! # Watchlist Core Library
//!
//! This library tracks entities awaiting periodic check-in. Submitting a goal
//! for an entity starts a countdown sized by its priority tier; when the
//! countdown runs out the entity is escalated and surfaced ahead of everything
//! that is not, oldest escalation first. The CLI is a thin layer over the
//! same library.
//!
//! ## Architecture
//!
//! - **Entity Store**: insertion-ordered in-memory collection
//! - **Escalation Scheduler**: one cancellable tokio countdown per entity
//! - **Ordering Policy**: pure function from a store snapshot to display order
//! - **Orchestrator**: validates updates, talks to the persistence
//!   collaborator, then mutates the store and (re)arms countdowns under one lock
//!
//! ## Key Components
//!
//! - [`Orchestrator`]: entry point for every read and update
//! - [`PersistEntities`]: trait for the external persistence collaborator
//! - [`Config`]: application configuration management
//! - [`Event`]: change notifications; `EntityEscalated` means the order changed

pub mod entity;
pub mod error;
pub mod escalation;
pub mod events;
pub mod orchestrator;
pub mod ordering;
pub mod persistence;
pub mod storage;
pub mod store;

pub use entity::{Entity, EntityId, EntityRecord, GoalUpdate, Priority};
pub use error::{ConfigError, CoreError, PersistenceError, ValidationError};
pub use escalation::{Clock, CountdownInfo, EscalationScheduler, SystemClock, TokioClock};
pub use events::Event;
pub use orchestrator::Orchestrator;
pub use persistence::{HttpPersistence, MemoryPersistence, PersistEntities};
pub use storage::Config;
pub use store::EntityStore;
