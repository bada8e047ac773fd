use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};

use datarepair_core::config::RepairConfig;
use datarepair_core::impls::RocksStore;
use datarepair_core::worker::{SegmentRepairer, WorkerGroup};
use datarepair_core::{InjuredSegment, QueueError, RepairQueue, StoreQueue, observability};

/// Data repair queue: enqueue injured segments and run repair workers.
#[derive(Debug, Parser)]
#[command(name = "datarepair", version, about)]
struct Cli {
    /// JSON config file
    #[arg(short, long, env = "DATAREPAIR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Queue store directory (overrides config)
    #[arg(long, env = "DATAREPAIR_STORE", global = true)]
    store: Option<PathBuf>,

    /// Log filter, e.g. "debug" (overrides config; RUST_LOG wins)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add an injured segment to the queue
    Enqueue {
        /// Segment path
        #[arg(long)]
        path: String,

        /// Lost piece indices, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        lost: Vec<i32>,
    },

    /// Remove the oldest segment and print it as JSON
    Dequeue,

    /// Run repair workers until Ctrl-C
    Work {
        /// Number of workers (overrides config)
        #[arg(long)]
        workers: Option<usize>,
    },
}

/// checker / repairer の本体は別プロセス。ここでは受け取った segment をログに出すだけ。
struct LogRepairer;

#[async_trait]
impl SegmentRepairer for LogRepairer {
    async fn repair(&self, segment: &InjuredSegment) -> Result<(), String> {
        tracing::info!(path = %segment.path(), lost_pieces = ?segment.lost_pieces(), "repair requested");
        Ok(())
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<RepairConfig> {
    let mut config = match &cli.config {
        Some(path) => RepairConfig::load(path)?,
        None => RepairConfig::default(),
    };
    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    if let Some(log) = &cli.log {
        config.log_filter = log.clone();
    }
    if let Command::Work {
        workers: Some(n), ..
    } = cli.command
    {
        config.workers = n;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    observability::init(&config.log_filter);

    let store_path = config.store_path.clone();
    let store = tokio::task::spawn_blocking(move || RocksStore::open(store_path))
        .await
        .context("store open task failed")?
        .with_context(|| format!("failed to open store {}", config.store_path.display()))?;
    let queue = Arc::new(StoreQueue::new(store));

    match cli.command {
        Command::Enqueue { path, lost } => {
            let segment = InjuredSegment::new(path, lost);
            queue.enqueue(&segment).await?;
            println!("enqueued: {segment}");
        }
        Command::Dequeue => match queue.dequeue().await {
            Ok(segment) => println!("{}", serde_json::to_string_pretty(&segment)?),
            Err(QueueError::Empty) => println!("queue is empty"),
            Err(err) => {
                // delete だけ失敗した場合も、読めた segment は出力する
                if let Some(segment) = err.recovered_segment() {
                    println!("{}", serde_json::to_string_pretty(segment)?);
                }
                return Err(err.into());
            }
        },
        Command::Work { .. } => {
            tracing::info!(
                workers = config.workers,
                store = %config.store_path.display(),
                "starting repair workers"
            );
            let group = WorkerGroup::spawn(
                config.workers,
                queue,
                Arc::new(LogRepairer),
                config.idle_backoff(),
            );
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
            group.shutdown_and_join().await;
        }
    }

    Ok(())
}
