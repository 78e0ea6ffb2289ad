//! Interactive board.
//!
//! Reads one command per line from stdin and reprints the board after every
//! tracker event, escalations included. Line commands:
//!
//! ```text
//! list
//! goal <id> <high|medium|low> <text...>
//! expand <id>
//! reset
//! add <name...>
//! delete <id>
//! help
//! quit
//! ```

use std::fmt::Write as _;
use std::str::SplitWhitespace;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use watchlist_core::{
    Config, CoreError, Entity, EntityId, Event, HttpPersistence, MemoryPersistence, Orchestrator,
    PersistEntities, Priority, ValidationError,
};

const HELP: &str = "commands: list | goal <id> <high|medium|low> <text> | expand <id> | reset | add <name> | delete <id> | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchCommand {
    List,
    Goal {
        id: EntityId,
        priority: Priority,
        goal: String,
    },
    Expand(EntityId),
    Reset,
    Add(String),
    Delete(EntityId),
    Help,
    Quit,
}

fn next_id(words: &mut SplitWhitespace<'_>, verb: &str) -> Result<EntityId, String> {
    words
        .next()
        .ok_or_else(|| format!("{verb}: missing id"))?
        .parse()
        .map_err(|e: ValidationError| e.to_string())
}

impl WatchCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();

        let command = match verb.as_str() {
            "list" | "ls" => Self::List,
            "expand" => Self::Expand(next_id(&mut words, &verb)?),
            "delete" | "rm" => Self::Delete(next_id(&mut words, &verb)?),
            "reset" => Self::Reset,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "goal" => {
                let id = next_id(&mut words, &verb)?;
                let priority = words
                    .next()
                    .unwrap_or_default()
                    .parse()
                    .map_err(|e: ValidationError| e.to_string())?;
                let goal = words.collect::<Vec<_>>().join(" ");
                Self::Goal { id, priority, goal }
            }
            "add" => Self::Add(words.collect::<Vec<_>>().join(" ")),
            other => return Err(format!("unknown command '{other}'")),
        };
        Ok(command)
    }
}

/// One line per entity, display order. `!` marks an unacknowledged alert,
/// `*` an escalation that was already looked at.
fn render(entities: &[Entity]) -> String {
    if entities.is_empty() {
        return "(no entities)\n".to_string();
    }
    let mut out = String::new();
    for entity in entities {
        let marker = if entity.alerted {
            '!'
        } else if entity.is_escalated() {
            '*'
        } else {
            ' '
        };
        let _ = write!(
            out,
            "[{marker}] {:>4}  {:<20} {:<6}",
            entity.id, entity.name, entity.priority
        );
        if let Some(at) = entity.escalated_at {
            let _ = write!(out, " since {}", at.format("%H:%M:%S"));
        }
        out.push('\n');
        if entity.expanded {
            let goal = if entity.has_goal() { entity.goal.as_str() } else { "-" };
            let _ = writeln!(out, "          goal: {goal}");
        }
    }
    out
}

fn print_board(orchestrator: &Orchestrator) {
    print!("{}", render(&orchestrator.ordered()));
}

/// What the session does with one result from the event channel.
#[derive(Debug, PartialEq, Eq)]
enum Reaction {
    /// Reprint the board, after the optional notice line.
    Redraw(Option<String>),
    Stop,
}

fn react(event: Result<Event, RecvError>) -> Reaction {
    match event {
        Ok(Event::EntityEscalated { id, .. }) => Reaction::Redraw(Some(format!("escalated: {id}"))),
        Ok(_) => Reaction::Redraw(None),
        // Whatever was missed, the board is re-read from the store.
        Err(RecvError::Lagged(skipped)) => {
            debug!(skipped, "event receiver lagged");
            Reaction::Redraw(None)
        }
        Err(RecvError::Closed) => Reaction::Stop,
    }
}

async fn apply(orchestrator: &Orchestrator, command: WatchCommand) -> Result<(), CoreError> {
    match command {
        WatchCommand::List => print_board(orchestrator),
        WatchCommand::Quit => {}
        WatchCommand::Help => println!("{HELP}"),
        WatchCommand::Goal { id, priority, goal } => {
            let entity = orchestrator.submit_goal(id, goal, priority).await?;
            if let Some(countdown) = orchestrator.countdown(id) {
                println!(
                    "{} escalates at {}",
                    entity.name,
                    countdown.deadline.format("%H:%M:%S")
                );
            }
        }
        WatchCommand::Expand(id) => {
            orchestrator.toggle_expand(id)?;
        }
        WatchCommand::Reset => {
            let cancelled = orchestrator.reset_all();
            println!("reset ({cancelled} countdowns cancelled)");
        }
        WatchCommand::Add(name) => {
            let entity = orchestrator.add_entity(&name).await?;
            println!("added {} ({})", entity.name, entity.id);
        }
        WatchCommand::Delete(id) => {
            let entity = orchestrator.delete_entity(id).await?;
            println!("deleted {} ({})", entity.name, entity.id);
        }
    }
    Ok(())
}

pub async fn run(
    config: &Config,
    offline: bool,
    seeds: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let persistence: Arc<dyn PersistEntities> = if offline {
        Arc::new(MemoryPersistence::with_names(seeds))
    } else {
        if !seeds.is_empty() {
            warn!("--seed is ignored without --offline");
        }
        Arc::new(HttpPersistence::from_config(&config.api)?)
    };
    let orchestrator = Orchestrator::new(persistence);
    let mut events = orchestrator.subscribe();

    let count = orchestrator.hydrate().await?;
    println!("watching {count} entities");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        // Events first: a command's own events are queued before the next
        // line is read, so its board is printed before stdin can end.
        tokio::select! {
            biased;

            event = events.recv() => match react(event) {
                Reaction::Redraw(notice) => {
                    if let Some(notice) = notice {
                        println!("{notice}");
                    }
                    print_board(&orchestrator);
                }
                Reaction::Stop => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match WatchCommand::parse(&line) {
                    Ok(WatchCommand::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = apply(&orchestrator, command).await {
                            println!("error: {e}");
                        }
                    }
                    Err(message) => println!("error: {message}"),
                }
            }
        }
    }

    let cancelled = orchestrator.shutdown();
    debug!(cancelled, "watch stopped");
    Ok(())
}
