use clap::Subcommand;
use watchlist_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value, or list the known keys when none is given
    Get {
        /// Config key (e.g. "api.endpoint", "log.filter")
        key: Option<String>,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key: None } => {
            for key in Config::KEYS {
                println!("{key}");
            }
        }
        ConfigAction::Get { key: Some(key) } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    let known = Config::KEYS.join(", ");
                    return Err(format!("unknown key: {key} (known: {known})").into());
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
