//! End-to-end escalation tests.
//!
//! Drive the public [`Orchestrator`] API with tokio's paused clock so every
//! countdown fires at an exact, reproducible instant.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;
use watchlist_core::{
    CoreError, EntityId, EntityRecord, Event, GoalUpdate, MemoryPersistence, Orchestrator,
    PersistEntities, PersistenceError, Priority, TokioClock, ValidationError,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn ms(n: i64) -> chrono::Duration {
    chrono::Duration::milliseconds(n)
}

async fn tracker(names: &[&str]) -> (Orchestrator, Arc<MemoryPersistence>) {
    let persistence = Arc::new(MemoryPersistence::with_names(names.iter().copied()));
    let orchestrator =
        Orchestrator::with_clock(persistence.clone(), Arc::new(TokioClock::starting_at(t0())));
    orchestrator.hydrate().await.unwrap();
    (orchestrator, persistence)
}

/// Let paused time run to `d` from now and give woken countdowns a turn.
async fn settle(d: Duration) {
    tokio::time::sleep(d).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

fn order(orchestrator: &Orchestrator) -> Vec<u64> {
    orchestrator.ordered().iter().map(|e| e.id.0).collect()
}

// ============================================================================
// Countdown timing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_each_tier_escalates_exactly_at_its_deadline() {
    for (priority, duration_ms) in [
        (Priority::High, 300_000),
        (Priority::Medium, 600_000),
        (Priority::Low, 1_200_000),
    ] {
        let (orchestrator, _) = tracker(&["A"]).await;
        orchestrator
            .submit_goal(EntityId(1), "check in", priority)
            .await
            .unwrap();

        settle(Duration::from_millis(duration_ms - 1)).await;
        let entity = orchestrator.get(EntityId(1)).unwrap();
        assert!(!entity.alerted, "{priority} fired early");
        assert!(entity.escalated_at.is_none());

        settle(Duration::from_millis(1)).await;
        let entity = orchestrator.get(EntityId(1)).unwrap();
        assert!(entity.alerted, "{priority} did not fire");
        assert_eq!(entity.escalated_at, Some(t0() + ms(duration_ms as i64)));
    }
}

#[tokio::test(start_paused = true)]
async fn test_priority_change_only_applies_when_rearmed() {
    let (orchestrator, _) = tracker(&["A"]).await;
    orchestrator
        .submit_goal(EntityId(1), "long task", Priority::Low)
        .await
        .unwrap();
    settle(Duration::from_secs(300)).await;
    assert!(!orchestrator.get(EntityId(1)).unwrap().alerted);

    orchestrator
        .submit_goal(EntityId(1), "long task", Priority::High)
        .await
        .unwrap();
    settle(Duration::from_secs(300)).await;
    let entity = orchestrator.get(EntityId(1)).unwrap();
    assert!(entity.alerted);
    assert_eq!(entity.escalated_at, Some(t0() + ms(600_000)));
}

#[tokio::test(start_paused = true)]
async fn test_rearm_before_expiry_never_fires_stale_countdown() {
    let (orchestrator, _) = tracker(&["A"]).await;
    orchestrator
        .submit_goal(EntityId(1), "first", Priority::High)
        .await
        .unwrap();
    settle(Duration::from_secs(299)).await;
    orchestrator
        .submit_goal(EntityId(1), "second", Priority::Medium)
        .await
        .unwrap();

    settle(Duration::from_secs(590)).await;
    assert!(!orchestrator.get(EntityId(1)).unwrap().alerted);
    assert_eq!(orchestrator.pending_countdowns(), 1);

    settle(Duration::from_secs(10)).await;
    let entity = orchestrator.get(EntityId(1)).unwrap();
    assert!(entity.alerted);
    assert_eq!(entity.escalated_at, Some(t0() + ms(899_000)));
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_concrete_scenario_single_high_priority_goal() {
    let (orchestrator, _) = tracker(&["A"]).await;
    let second = orchestrator.add_entity("B").await.unwrap();
    assert_eq!(second.id, EntityId(2));

    orchestrator
        .submit_goal(EntityId(1), "read 10 pages", Priority::High)
        .await
        .unwrap();
    assert_eq!(order(&orchestrator), vec![1, 2]);
    assert!(!orchestrator.get(EntityId(2)).unwrap().is_escalated());

    settle(Duration::from_millis(300_000)).await;
    let first = orchestrator.get(EntityId(1)).unwrap();
    assert!(first.alerted);
    assert_eq!(first.escalated_at, Some(t0() + ms(300_000)));

    let ordered = orchestrator.ordered();
    assert!(ordered[0].is_escalated());
    assert_eq!(ordered[0].id, EntityId(1));
    assert!(!ordered[1].is_escalated());
    assert_eq!(ordered[1].id, EntityId(2));

    settle(Duration::from_secs(7_200)).await;
    assert!(!orchestrator.get(EntityId(2)).unwrap().is_escalated());
}

#[tokio::test(start_paused = true)]
async fn test_earliest_expiry_surfaces_first() {
    let (orchestrator, _) = tracker(&["A", "B", "C"]).await;
    orchestrator
        .submit_goal(EntityId(2), "b", Priority::Medium)
        .await
        .unwrap();
    orchestrator
        .submit_goal(EntityId(3), "c", Priority::High)
        .await
        .unwrap();
    assert_eq!(order(&orchestrator), vec![1, 2, 3]);

    settle(Duration::from_secs(300)).await;
    assert_eq!(order(&orchestrator), vec![3, 1, 2]);

    settle(Duration::from_secs(300)).await;
    assert_eq!(order(&orchestrator), vec![3, 2, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_expand_round_trip_keeps_queue_position() {
    let (orchestrator, _) = tracker(&["A", "B", "C"]).await;
    orchestrator
        .submit_goal(EntityId(3), "c", Priority::High)
        .await
        .unwrap();
    orchestrator
        .submit_goal(EntityId(2), "b", Priority::Medium)
        .await
        .unwrap();
    settle(Duration::from_secs(600)).await;
    assert_eq!(order(&orchestrator), vec![3, 2, 1]);
    let escalated_at = orchestrator.get(EntityId(3)).unwrap().escalated_at;

    let expanded = orchestrator.toggle_expand(EntityId(3)).unwrap();
    assert!(!expanded.alerted);
    assert_eq!(order(&orchestrator), vec![3, 2, 1]);

    let collapsed = orchestrator.toggle_expand(EntityId(3)).unwrap();
    assert!(!collapsed.alerted);
    assert!(!collapsed.expanded);
    assert_eq!(collapsed.escalated_at, escalated_at);
    assert_eq!(order(&orchestrator), vec![3, 2, 1]);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_reset_all_cancels_pending_countdowns() {
    let (orchestrator, _) = tracker(&["A", "B"]).await;
    let mut events = orchestrator.subscribe();
    orchestrator
        .submit_goal(EntityId(1), "a", Priority::High)
        .await
        .unwrap();
    orchestrator
        .submit_goal(EntityId(2), "b", Priority::Low)
        .await
        .unwrap();

    assert_eq!(orchestrator.reset_all(), 2);
    settle(Duration::from_secs(3 * 3_600)).await;

    assert_eq!(orchestrator.pending_countdowns(), 0);
    assert!(orchestrator.entities().iter().all(|e| !e.alerted && !e.is_escalated()));

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(!seen
        .iter()
        .any(|e| matches!(e, Event::EntityEscalated { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, Event::EntitiesReset { cancelled_countdowns: 2, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_deleted_entity_is_never_resurrected() {
    let (orchestrator, _) = tracker(&["A", "B"]).await;
    orchestrator
        .submit_goal(EntityId(1), "a", Priority::High)
        .await
        .unwrap();
    orchestrator.delete_entity(EntityId(1)).await.unwrap();

    settle(Duration::from_secs(600)).await;
    assert!(matches!(
        orchestrator.get(EntityId(1)),
        Err(CoreError::NotFound { .. })
    ));
    assert_eq!(order(&orchestrator), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_goal_touches_nothing() {
    let (orchestrator, persistence) = tracker(&["A"]).await;
    let calls = persistence.calls();
    let err = orchestrator
        .submit_goal(EntityId(1), "", Priority::High)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::EmptyGoal)));
    assert_eq!(persistence.calls(), calls);
    assert!(persistence.stored_goal(EntityId(1)).is_none());
    assert!(orchestrator.countdown(EntityId(1)).is_none());

    settle(Duration::from_secs(3_600)).await;
    assert!(!orchestrator.get(EntityId(1)).unwrap().alerted);
}

// ============================================================================
// In-flight collaborator calls
// ============================================================================

/// Collaborator whose `update` and `delete` wait for the test to release them.
struct GatedPersistence {
    inner: MemoryPersistence,
    entered: Notify,
    release: Notify,
}

impl GatedPersistence {
    fn new(names: &[&str]) -> Self {
        Self {
            inner: MemoryPersistence::with_names(names.iter().copied()),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    async fn gate(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[async_trait]
impl PersistEntities for GatedPersistence {
    async fn list(&self) -> Result<Vec<EntityRecord>, PersistenceError> {
        self.inner.list().await
    }

    async fn create(&self, name: &str) -> Result<EntityRecord, PersistenceError> {
        self.inner.create(name).await
    }

    async fn update(&self, id: EntityId, update: &GoalUpdate) -> Result<(), PersistenceError> {
        self.gate().await;
        self.inner.update(id, update).await
    }

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError> {
        self.gate().await;
        self.inner.delete(id).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_goal_landing_after_reset_wins() {
    let persistence = Arc::new(GatedPersistence::new(&["A"]));
    let orchestrator =
        Orchestrator::with_clock(persistence.clone(), Arc::new(TokioClock::starting_at(t0())));
    orchestrator.hydrate().await.unwrap();

    let submit = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .submit_goal(EntityId(1), "late", Priority::High)
                .await
        })
    };
    persistence.entered.notified().await;

    orchestrator.reset_all();
    persistence.release.notify_one();
    let entity = submit.await.unwrap().unwrap();
    assert_eq!(entity.goal, "late");
    assert_eq!(orchestrator.pending_countdowns(), 1);

    settle(Duration::from_secs(300)).await;
    assert!(orchestrator.get(EntityId(1)).unwrap().alerted);
}

#[tokio::test(start_paused = true)]
async fn test_delete_in_flight_during_expiry_still_removes() {
    let persistence = Arc::new(GatedPersistence::new(&["A"]));
    let orchestrator =
        Orchestrator::with_clock(persistence.clone(), Arc::new(TokioClock::starting_at(t0())));
    orchestrator.hydrate().await.unwrap();

    // Arm through a plain update first.
    let submit = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .submit_goal(EntityId(1), "a", Priority::High)
                .await
        })
    };
    persistence.entered.notified().await;
    persistence.release.notify_one();
    submit.await.unwrap().unwrap();

    let delete = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.delete_entity(EntityId(1)).await })
    };
    persistence.entered.notified().await;

    // Countdown fires while the delete is still in flight.
    settle(Duration::from_secs(300)).await;
    assert!(orchestrator.get(EntityId(1)).unwrap().alerted);

    persistence.release.notify_one();
    delete.await.unwrap().unwrap();
    assert!(orchestrator.entities().is_empty());
    assert_eq!(orchestrator.pending_countdowns(), 0);
}
