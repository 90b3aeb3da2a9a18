//! Binary entrypoint for the rpgsgbd game server.
//!
//! Commands:
//! - `start [--port <n>] [--bind <addr>]` - serve the game API (and the static client, if present)
//! - `init` - write a starter `config.toml` and seed the character roster
//! - `status` - print the stored session count and the character catalog
//!
//! See the library crate docs for module-level details: `rpgsgbd::`.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use rpgsgbd::config::Config;
use rpgsgbd::game::{GameService, GameStore};

#[derive(Parser)]
#[command(name = "rpgsgbd")]
#[command(about = "Session store and combat engine for a browser turn-based RPG")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the game server
    Start {
        /// TCP port, overrides config and the PORT variable
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (e.g. 127.0.0.1)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Write a default configuration and seed the store
    Init,
    /// Show stored sessions and the character catalog
    Status,
}

/// Config file when present, otherwise defaults plus environment.
async fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::load(path).await
    } else {
        Config::from_env()
    }
}

fn open_store(config: &Config) -> Result<GameStore> {
    let db_path = config.storage.resolved_db_path();
    GameStore::open(&db_path).with_context(|| format!("opening store at {}", db_path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port, bind } => {
            let mut config = load_config(&cli.config).await?;
            init_logging(Some(&config), cli.verbose);
            if !Path::new(&cli.config).exists() {
                warn!("{} not found; running with defaults", cli.config);
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            info!("Starting rpgsgbd v{}", env!("CARGO_PKG_VERSION"));

            let store = open_store(&config)?;
            let service = Arc::new(GameService::new(store, config.game.clone())?);
            rpgsgbd::web::serve(service, &config.server).await?;
        }
        Commands::Init => {
            init_logging(None, cli.verbose);
            if Path::new(&cli.config).exists() {
                warn!("{} already exists; leaving it untouched", cli.config);
            } else {
                Config::create_default(&cli.config).await?;
                info!("Configuration file created at {}", cli.config);
            }
            let config = load_config(&cli.config).await?;
            let store = open_store(&config)?;
            let seeded = store.seed_characters_if_needed()?;
            info!(
                "Store ready at {} ({} characters seeded)",
                config.storage.resolved_db_path().display(),
                seeded
            );
        }
        Commands::Status => {
            let config = load_config(&cli.config).await?;
            init_logging(Some(&config), cli.verbose);
            let store = open_store(&config)?;
            println!("rpgsgbd v{}", env!("CARGO_PKG_VERSION"));
            println!("Store: {}", config.storage.resolved_db_path().display());
            println!("Sessions: {}", store.session_count());
            println!("Characters:");
            for c in store.list_characters()? {
                println!(
                    "  {:>3} {:<10} {:<10} lvl {} atk {} def {} hp {}",
                    c.id, c.name, c.class, c.level, c.attack, c.defense, c.base_hp
                );
            }
        }
    }

    Ok(())
}

fn init_logging(config: Option<&Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // sled is chatty at debug
    builder.filter_module("sled", log::LevelFilter::Warn);

    let file = config
        .and_then(|c| c.logging.file.as_deref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Detached runs have no terminal; the file is then the only sink.
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
