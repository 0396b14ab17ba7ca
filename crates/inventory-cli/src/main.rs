//! CLI entry point for the inventory graph.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, EnvFilter};

use inventory_core::config::{BackendKind, InventoryConfig};
use inventory_engine::{Backend, BroadcastSink, Inventory, MemoryBackend};
use inventory_graph::{GraphConfig, Neo4jBackend};

use inventory_cli::{execute, seed, Command};

#[derive(Parser)]
#[command(name = "inventory")]
#[command(about = "Inspect and edit the tenant / environment / resource inventory graph")]
struct Cli {
    /// Config file prefix (default: inventory).
    #[arg(short, long, default_value = "inventory")]
    config: String,

    /// Storage backend: memory, neo4j. Overrides the config file.
    #[arg(short, long)]
    backend: Option<String>,

    /// JSON seed file applied before the command runs.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Human-readable logs instead of JSON lines.
    #[arg(long)]
    plain_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.plain_logs {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    }

    let config = InventoryConfig::load(&cli.config)?;
    let backend = match &cli.backend {
        Some(raw) => raw.parse::<BackendKind>()?,
        None => config.backend,
    };

    match backend {
        BackendKind::Memory => run(MemoryBackend::new(), &cli, &config).await,
        BackendKind::Neo4j => {
            let graph = Neo4jBackend::connect(&GraphConfig::from(&config.neo4j)).await?;
            run(graph, &cli, &config).await
        }
    }
}

async fn run<B: Backend>(backend: B, cli: &Cli, config: &InventoryConfig) -> anyhow::Result<()> {
    let sink = Arc::new(BroadcastSink::new(config.events.channel_capacity));
    let mut events = sink.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(
                    event_id = %event.id.0,
                    action = ?event.action(),
                    "Inventory event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let inventory = Inventory::new(backend)
        .with_sink(sink)
        .with_page_limit(config.paging.default_limit);

    if let Some(path) = &cli.seed {
        let entries = seed::load(path)?;
        seed::apply(&inventory, &entries).await?;
    }

    let output = execute(&inventory, &cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
