/// Cadence - least-played queue driving a remote player
mod commands;
mod config;

use anyhow::Context;
use cadence_playback::SessionOrchestrator;
use cadence_remote::{HttpTransport, RemoteSession};
use cadence_storage::SqliteStore;
use clap::{Parser, Subcommand};
use crate::commands::Orchestrator;
use crate::config::CadenceConfig;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Least-played queue for a remote player", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./cadence.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the catalog from a JSON array of tracks
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Show the queue window
    Queue,
    /// Play the current track
    Play,
    /// Pause playback
    Pause,
    /// Resume playback
    Resume,
    /// Advance to the next track
    Next,
    /// Go back to the previous track
    Previous,
    /// Jump to a queue position relative to the current track
    Jump {
        /// Position (negative for history)
        #[arg(allow_negative_numbers = true)]
        position: i32,
    },
    /// Reorder the upcoming tracks by play count
    Shuffle,
    /// Show recent plays and skips
    History {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show play-count statistics
    Stats,
    /// Find catalog tracks by title, artist, or album
    Search {
        query: String,
        /// Maximum number of matches to list
        #[arg(short, long, default_value_t = 25)]
        limit: usize,
    },
    /// Show catalog size and total duration
    Catalog,
    /// Follow the remote player until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = CadenceConfig::load(cli.config.as_deref())?;
    let orchestrator = build_orchestrator(&config).await?;

    match cli.command {
        Commands::Import { file } => commands::import(&orchestrator, &file).await?,
        Commands::Queue => commands::queue(&orchestrator).await?,
        Commands::Play => commands::play(&orchestrator).await?,
        Commands::Pause => commands::pause(&orchestrator).await?,
        Commands::Resume => commands::resume(&orchestrator).await?,
        Commands::Next => commands::next(&orchestrator).await?,
        Commands::Previous => commands::previous(&orchestrator).await?,
        Commands::Jump { position } => commands::jump(&orchestrator, position).await?,
        Commands::Shuffle => commands::shuffle(&orchestrator).await?,
        Commands::History { limit } => commands::history(&orchestrator, limit).await?,
        Commands::Stats => commands::stats(&orchestrator).await?,
        Commands::Search { query, limit } => commands::search(&orchestrator, &query, limit).await?,
        Commands::Catalog => commands::catalog(&orchestrator).await?,
        Commands::Watch => commands::watch(Arc::clone(&orchestrator)).await?,
    }

    Ok(())
}

async fn build_orchestrator(config: &CadenceConfig) -> anyhow::Result<Arc<Orchestrator>> {
    ensure_database_dir(&config.storage.database_url).await?;

    // Initialize database
    let pool = cadence_storage::create_pool(&config.storage.database_url).await?;
    cadence_storage::run_migrations(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool));
    tracing::debug!(url = %config.storage.database_url, "Database connected");

    let transport = HttpTransport::new(config.transport_config())?;
    let session = Arc::new(RemoteSession::new(transport));

    let orchestrator = SessionOrchestrator::new(store, session, config.orchestrator_config());
    orchestrator.load().await?;

    Ok(Arc::new(orchestrator))
}

/// SQLite creates the file but not its parent directory
async fn ensure_database_dir(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }

    if let Some(parent) = std::path::Path::new(path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}
