//! One-shot commands against the configured API.
//!
//! Countdowns only live as long as the process, so `goal` reports the
//! deadline and exits; use `watch` to see escalations happen.

use std::sync::Arc;

use serde_json::json;
use watchlist_core::{Config, EntityId, HttpPersistence, Orchestrator, Priority};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

async fn connect(config: &Config) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let persistence = HttpPersistence::from_config(&config.api)?;
    let orchestrator = Orchestrator::new(Arc::new(persistence));
    orchestrator.hydrate().await?;
    Ok(orchestrator)
}

pub async fn list(config: &Config) -> CmdResult {
    let orchestrator = connect(config).await?;
    println!("{}", serde_json::to_string_pretty(&orchestrator.ordered())?);
    Ok(())
}

pub async fn add(config: &Config, name: &str) -> CmdResult {
    let orchestrator = connect(config).await?;
    let entity = orchestrator.add_entity(name).await?;
    println!("{}", serde_json::to_string_pretty(&entity)?);
    Ok(())
}

pub async fn delete(config: &Config, id: EntityId) -> CmdResult {
    let orchestrator = connect(config).await?;
    let entity = orchestrator.delete_entity(id).await?;
    eprintln!("Deleted: {} ({})", entity.name, entity.id);
    Ok(())
}

pub async fn goal(config: &Config, id: EntityId, goal: &str, priority: Priority) -> CmdResult {
    let orchestrator = connect(config).await?;
    let entity = orchestrator.submit_goal(id, goal, priority).await?;
    let countdown = orchestrator.countdown(id);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "entity": entity, "countdown": countdown }))?
    );
    orchestrator.shutdown();
    Ok(())
}
