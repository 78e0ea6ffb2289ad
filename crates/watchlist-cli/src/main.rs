use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use watchlist_core::{Config, EntityId, Priority};

mod commands;

#[derive(Parser)]
#[command(name = "watchlist-cli", version, about = "Watchlist CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print entities in display order as JSON
    List,
    /// Create an entity
    Add {
        /// Display name
        name: String,
    },
    /// Delete an entity
    Delete {
        /// Entity ID
        id: EntityId,
    },
    /// Submit a goal and report when it would escalate
    Goal {
        /// Entity ID
        id: EntityId,
        /// Goal text
        goal: String,
        /// Countdown tier: high (5m), medium (10m) or low (20m)
        #[arg(long, default_value = "low")]
        priority: Priority,
    },
    /// Track entities interactively, reprinting the board on escalation
    Watch {
        /// Keep everything in memory instead of calling the API
        #[arg(long)]
        offline: bool,
        /// Entity names to start with (offline only, repeatable)
        #[arg(long = "seed", value_name = "NAME")]
        seeds: Vec<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays machine readable.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("WATCHLIST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(config: &Config, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::List => commands::entity::list(config).await,
        Commands::Add { name } => commands::entity::add(config, &name).await,
        Commands::Delete { id } => commands::entity::delete(config, id).await,
        Commands::Goal { id, goal, priority } => {
            commands::entity::goal(config, id, &goal, priority).await
        }
        Commands::Watch { offline, seeds } => commands::watch::run(config, offline, seeds).await,
        Commands::Config { action } => commands::config::run(action),
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    init_tracing(&config);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(dispatch(&config, command));
    // A pending stdin read would otherwise hold the process open.
    runtime.shutdown_background();
    result
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
