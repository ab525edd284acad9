//! hackrev-api - HTTP service for the hackathon peer-review ledger
//!
//! Startup:
//! 1. Parse CLI, load TOML bootstrap config
//! 2. Initialize tracing, log build identification
//! 3. Resolve root folder, open SQLite (unless in-memory), replay the ledger
//! 4. Serve until Ctrl+C / SIGTERM

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hackrev_api::{build_router, AppState};
use hackrev_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use hackrev_common::db::init_database;
use hackrev_common::EventBus;
use hackrev_ledger::{LedgerStore, SqliteBackend};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Capacity of the ledger event broadcast channel
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for hackrev-api
#[derive(Parser, Debug)]
#[command(name = "hackrev-api")]
#[command(about = "Hackathon peer-review ledger service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "HACKREV_PORT")]
    port: Option<u16>,

    /// Root folder holding the ledger database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long, env = "HACKREV_CONFIG")]
    config: Option<PathBuf>,

    /// Keep the ledger in memory only
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    init_tracing(&config)?;

    info!(
        "Starting HackReview ledger (hackrev-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let events = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
    let ledger = open_ledger(&args, &config)
        .await?
        .with_events(events.clone());
    let ledger = Arc::new(ledger);

    let search_timeout = Duration::from_millis(config.search.fanout_timeout_ms);
    info!("Fan-out search deadline: {:?}", search_timeout);

    let state = AppState::new(ledger, events, search_timeout);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", config.bind_host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("hackrev-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over `logging.level`. With `logging.file` set, output goes
/// to that file instead of stderr.
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid logging.level")?;

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
    Ok(())
}

/// Open the ledger over SQLite, or in memory when asked to
async fn open_ledger(args: &Args, config: &TomlConfig) -> Result<LedgerStore> {
    if args.in_memory || config.persistence.in_memory {
        warn!("In-memory ledger: reviews will not survive a restart");
        return Ok(LedgerStore::in_memory());
    }

    let root_folder = RootFolderResolver::new("hackrev-api")
        .with_cli_arg(args.root_folder.clone())
        .with_toml(config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    LedgerStore::open(Arc::new(SqliteBackend::new(pool)))
        .await
        .context("Failed to replay review ledger")
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
