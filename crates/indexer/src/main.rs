//! TrustGraph Indexer - trust network edge derivation service
//!
//! This binary provides:
//! - Periodic snapshot fetch, edge derivation and edge store synchronization
//! - One-shot sync and offline derivation
//! - Database status and initialization

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use trustgraph_core::DerivedEdge;
use trustgraph_engine::{derive_from_raw, ExtractionStats, TransferGraph};
use trustgraph_indexer::config::{Config, LoggingConfig};
use trustgraph_indexer::source::{parse_snapshot, ConfiguredSource};
use trustgraph_indexer::storage::Storage;
use trustgraph_indexer::updater::{GraphUpdater, GRAPH_UPDATE_METRICS};

const DEFAULT_DATABASE_URL: &str = "sqlite://trustgraph.db";

#[derive(Parser)]
#[command(name = "trustgraph-indexer")]
#[command(version, about = "Trust graph edge derivation and storage service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "indexer.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the periodic graph updater
    Run,

    /// Run a single fetch/derive/sync pass and print the report
    SyncOnce,

    /// Derive edges from a snapshot file without touching the database
    Derive {
        /// JSON snapshot (`{"accounts": [...]}` or a bare array)
        #[arg(long)]
        input: PathBuf,
    },

    /// Show database statistics and the last update
    Status,

    /// Initialize the database
    InitDb {
        /// Database URL
        #[arg(long, default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the config file when it is readable.
    let logging = Config::from_file(&cli.config)
        .map(|config| config.logging)
        .unwrap_or_default();
    init_logging(cli.debug, &logging)?;

    info!("TrustGraph Indexer starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_updater(&cli.config).await?,
        Commands::SyncOnce => sync_once(&cli.config).await?,
        Commands::Derive { input } => derive_offline(&input).await?,
        Commands::Status => show_status(&cli.config).await?,
        Commands::InitDb { database_url } => init_database(&database_url).await?,
    }

    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(debug: bool, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("trustgraph_indexer=debug,trustgraph_engine=debug,sqlx=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "trustgraph_indexer={0},trustgraph_engine={0}",
                logging.level
            ))
        })
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .context("Failed to install JSON log subscriber")?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
            .context("Failed to install log subscriber")?;
    }

    Ok(())
}

async fn connect(config: &Config) -> Result<Storage> {
    let storage = Storage::new(
        &config.database.url,
        Some(config.database.max_connections),
        Some(config.database.min_connections),
    )
    .await
    .context("Failed to connect to database")?;

    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    Ok(storage)
}

async fn build_updater(config: &Config) -> Result<GraphUpdater<ConfiguredSource>> {
    let source = ConfiguredSource::from_config(&config.source)?;
    let storage = connect(config).await?;
    Ok(GraphUpdater::new(
        source,
        storage,
        Duration::from_secs(config.updater.interval_secs),
    ))
}

/// Main service - periodic graph updates
async fn run_updater(config_path: &str) -> Result<()> {
    info!("Starting graph updater with config: {}", config_path);

    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Source: {:?}", config.source.kind);
    info!("  Database: {}", config.database.url);
    info!("  Interval: {}s", config.updater.interval_secs);

    let updater = build_updater(&config).await?;

    tokio::select! {
        result = updater.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping graph updater");
        }
    }

    Ok(())
}

async fn sync_once(config_path: &str) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let updater = build_updater(&config).await?;

    let summary = updater.run_once().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DerivationOutput {
    stats: ExtractionStats,
    node_count: usize,
    edges: Vec<DerivedEdge>,
}

async fn derive_offline(input: &Path) -> Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read snapshot: {}", input.display()))?;
    let records = parse_snapshot(&bytes)?;

    let derivation = derive_from_raw(&records).context("Failed to derive edges")?;
    let graph = TransferGraph::from_edges(derivation.edges);

    let output = DerivationOutput {
        stats: derivation.stats,
        node_count: graph.nodes().len(),
        edges: graph.edges().to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn show_status(config_path: &str) -> Result<()> {
    info!("Checking indexer status");

    // Fall back to the default database ONLY if the config file doesn't exist
    let storage = match Config::from_file(config_path) {
        Ok(config) => {
            info!("Using database from config: {}", config.database.url);
            connect(&config).await?
        }
        Err(e) => {
            let is_not_found = e.chain().any(|cause| {
                cause
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
            });

            if !is_not_found {
                return Err(e).context("Failed to load config file");
            }

            info!(
                "Config file not found, using default database: {}",
                DEFAULT_DATABASE_URL
            );
            let storage = Storage::new(DEFAULT_DATABASE_URL, None, None)
                .await
                .context("Failed to connect to database")?;
            storage
                .run_migrations()
                .await
                .context("Failed to run migrations")?;
            storage
        }
    };

    let stats = storage.stats().await?;
    let last_update = storage.get_metrics(GRAPH_UPDATE_METRICS).await?;

    println!("\n=== TrustGraph Indexer Status ===\n");
    println!("Database Statistics:");
    println!("  Total Edges: {}", stats.edge_count);
    println!("  Metrics Entries: {}", stats.metrics_count);
    println!(
        "  Last Edge Update: {}",
        format_timestamp(stats.last_edge_update)
    );

    match last_update {
        Some(record) => {
            println!(
                "\nLast Graph Update ({}):",
                format_timestamp(Some(record.updated_at))
            );
            println!("{}", serde_json::to_string_pretty(&record.payload)?);
        }
        None => println!("\nNo graph update recorded yet"),
    }

    storage.close().await;
    Ok(())
}

fn format_timestamp(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}

async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database: {}", database_url);

    let storage = Storage::new(database_url, None, None)
        .await
        .context("Failed to connect to database")?;

    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    storage
        .health_check()
        .await
        .context("Database health check failed")?;

    let stats = storage.stats().await?;
    info!("Database initialized successfully!");
    info!("  Edges: {}", stats.edge_count);
    info!("  Metrics: {}", stats.metrics_count);

    storage.close().await;
    Ok(())
}
