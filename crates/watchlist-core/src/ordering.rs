//! Display ordering.
//!
//! Entities whose countdown expired come first, oldest expiry on top. Entities
//! without an escalation follow in store order. The function is pure and is
//! re-evaluated on every read.

use crate::entity::Entity;

/// Order a store snapshot for display.
///
/// `Vec::sort_by_key` is stable, so equal escalation times keep insertion order.
pub fn order(entities: Vec<Entity>) -> Vec<Entity> {
    let (mut escalated, pending): (Vec<Entity>, Vec<Entity>) =
        entities.into_iter().partition(Entity::is_escalated);
    escalated.sort_by_key(|e| e.escalated_at);
    escalated.extend(pending);
    escalated
}
