//! CLI Module
//!
//! Command-line interface for replaying captured event streams into a store
//! and inspecting what a session holds.

use crate::bus::EventBus;
use crate::client::NoopClient;
use crate::config::Config;
use crate::events::SyncEvent;
use crate::store::SqlxStore;
use crate::sync::SyncEngine;
use crate::webhook::LogSink;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// wastore - per-session WhatsApp Web store
#[derive(Parser, Debug)]
#[command(name = "wastore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug mode (writes rolling log files)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON-lines event capture into the store
    Replay {
        /// Session the events belong to
        #[arg(short, long)]
        session: String,

        /// File with one `{"event": ..., "data": ...}` object per line
        file: PathBuf,
    },

    /// Show stored chat, contact and message counts for a session
    Stats {
        /// Session to inspect
        #[arg(short, long)]
        session: String,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Main CLI entry point
pub async fn run(cli: Cli, config: &Config) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(force),
        Some(Commands::Replay { session, file }) => cmd_replay(config, &session, &file).await,
        Some(Commands::Stats { session }) => cmd_stats(config, &session).await,
        None => {
            println!("Nothing to do. Run `wastore --help` for the available commands.");
            Ok(())
        }
    }
}

/// Load configuration from file or defaults
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config = if let Some(path) = config_path {
        tracing::info!("Loading configuration from custom path: {}", path);
        Config::load_from_path(path)?
    } else {
        tracing::debug!("Loading default configuration");
        Config::load()?
    };

    config.validate()?;
    Ok(config)
}

/// Initialize configuration file
fn cmd_init(force: bool) -> Result<()> {
    let config_path =
        Config::system_config_path().context("Could not determine config directory")?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;
    println!("Configuration initialized at: {}", config_path.display());
    Ok(())
}

async fn cmd_replay(config: &Config, session: &str, file: &Path) -> Result<()> {
    let store = Arc::new(SqlxStore::new(&config.database.path).await?);
    let (emitted, skipped) = replay(Arc::clone(&store), config, session, file).await?;

    let counts = store.session_counts(session).await?;
    println!("Replayed {} event(s), skipped {}", emitted, skipped);
    print_counts(session, counts.chats, counts.contacts, counts.messages);
    Ok(())
}

/// Feed every event in `file` through a fresh engine bound to `store`.
/// Returns `(emitted, skipped)` line counts.
async fn replay(
    store: Arc<SqlxStore>,
    config: &Config,
    session: &str,
    file: &Path,
) -> Result<(usize, usize)> {
    let handle = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("Failed to open event file: {:?}", file))?;

    let engine = SyncEngine::new(
        session,
        store,
        Arc::new(NoopClient),
        Arc::new(LogSink),
        config.sync.clone(),
    );
    let bus = EventBus::new();
    engine.listen(&bus);

    let mut lines = BufReader::new(handle).lines();
    let mut line_no = 0usize;
    let (mut emitted, mut skipped) = (0usize, 0usize);
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SyncEvent>(&line) {
            Ok(event) => {
                bus.emit(event);
                emitted += 1;
            }
            Err(e) => {
                tracing::warn!(line = line_no, "Skipping unreadable event: {}", e);
                skipped += 1;
            }
        }
    }

    bus.close().await;
    tracing::info!(session = engine.session_id(), emitted, skipped, "Replay finished");
    engine.shutdown().await;
    Ok((emitted, skipped))
}

async fn cmd_stats(config: &Config, session: &str) -> Result<()> {
    let store = SqlxStore::new(&config.database.path).await?;
    let counts = store.session_counts(session).await?;
    print_counts(session, counts.chats, counts.contacts, counts.messages);
    Ok(())
}

fn print_counts(session: &str, chats: i64, contacts: i64, messages: i64) {
    println!("Session {}", session);
    println!("  chats:    {}", chats);
    println!("  contacts: {}", contacts);
    println!("  messages: {}", messages);
}
