// Trending harvester binary
//
// Drives the harvest pipeline from the command line: one-shot snapshot runs,
// a long-running change-event listener, the lookup endpoint and the trending
// list publisher. Configuration comes from the environment (and `.env`).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trending_harvest::capability::{ChromeSessionFactory, SessionFactory};
use trending_harvest::harvest_engine::{PipelineError, admit_events, publish_trending};
use trending_harvest::lookup_api::{self, LookupState};
use trending_harvest::{
    BrowserPool, BrowserPoolConfig, HarvestConfig, RedisDedupGate, RedisSnapshotStore,
    ShutdownSignal, TokenStore, WorkerPool, events, sync_once,
};

#[derive(Parser, Debug)]
#[command(name = "trending-harvest", version, about = "Harvest trending tokens and their top traders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the latest snapshot, process it once and print the report
    Sync,
    /// Process tokens named by change events until interrupted
    Listen,
    /// Serve the token lookup endpoint
    Serve,
    /// Capture the trending list and publish it as a new snapshot
    Publish,
}

/// Shared handles built once at startup and passed to every mode.
struct Runtime {
    config: HarvestConfig,
    store: TokenStore,
    browsers: Arc<BrowserPool>,
    factory: Arc<dyn SessionFactory>,
}

impl Runtime {
    async fn start(config: HarvestConfig) -> Result<Self> {
        let store = TokenStore::connect(config.database_url())
            .await
            .with_context(|| format!("Failed to open store at {}", config.database_url()))?;

        let browsers = BrowserPool::new(BrowserPoolConfig {
            max_pool_size: config.workers(),
            headless: config.headless(),
            ..BrowserPoolConfig::default()
        });
        browsers.start().await.context("Failed to start browser pool")?;

        let factory: Arc<dyn SessionFactory> = Arc::new(
            ChromeSessionFactory::new(Arc::clone(&browsers))
                .with_navigation_timeout(config.navigation_timeout()),
        );

        Ok(Self {
            config,
            store,
            browsers,
            factory,
        })
    }

    fn worker_pool(&self, shutdown: ShutdownSignal) -> WorkerPool {
        WorkerPool::new(
            Arc::clone(&self.factory),
            self.store.clone(),
            Arc::new(self.config.plan()),
            self.config.workers(),
        )
        .with_shutdown(shutdown)
    }

    async fn stop(self) {
        if let Err(e) = self.browsers.shutdown().await {
            warn!("Browser pool shutdown failed: {e:#}");
        }
        self.store.close().await;
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Request a cooperative stop on Ctrl-C.
fn stop_on_ctrl_c(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; finishing in-flight items");
            shutdown.request();
        }
    });
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_sync(runtime: &Runtime) -> Result<()> {
    let config = &runtime.config;
    let snapshots = RedisSnapshotStore::connect(config.redis_url(), config.snapshot_prefix()).await?;

    let shutdown = ShutdownSignal::new();
    stop_on_ctrl_c(shutdown.clone());
    let pool = runtime.worker_pool(shutdown);

    match sync_once(&snapshots, &config.poll_policy(), &pool).await {
        Ok(report) => {
            info!(completed = report.completed(), failed = report.failed(), "Sync finished");
            print_json(&report)
        }
        Err(PipelineError::StorageConnectionLost { reason, report }) => {
            print_json(&report)?;
            anyhow::bail!("Storage connection lost: {reason}")
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_listen(runtime: &Runtime) -> Result<()> {
    let config = &runtime.config;
    let client = redis::Client::open(config.redis_url()).context("Invalid Redis URL")?;
    let stream = events::subscribe(&client, config.event_channel()).await?;
    let gate = RedisDedupGate::connect(config.redis_url(), config.dedupe_ttl()).await?;

    let shutdown = ShutdownSignal::new();
    stop_on_ctrl_c(shutdown.clone());
    let pool = runtime.worker_pool(shutdown.clone());

    let (sender, receiver) = mpsc::channel(pool.workers() * 4);
    // The feeder drops `sender` when it stops, which lets the pool drain
    let (stats, outcome) = tokio::join!(
        admit_events(stream, &gate, sender, shutdown.clone()),
        pool.run_queue(receiver),
    );
    info!(admitted = stats.admitted, duplicates = stats.duplicates, "Listener stopped");

    match outcome {
        Ok(report) => print_json(&report),
        Err(PipelineError::StorageConnectionLost { reason, report }) => {
            print_json(&report)?;
            anyhow::bail!("Storage connection lost: {reason}")
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_serve(runtime: &Runtime) -> Result<()> {
    let addr = runtime.config.listen_addr();
    let state = LookupState {
        store: runtime.store.clone(),
        factory: Arc::clone(&runtime.factory),
        plan: Arc::new(runtime.config.plan()),
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Lookup endpoint listening");

    axum::serve(listener, lookup_api::router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                error!("Failed to listen for Ctrl-C");
            }
        })
        .await
        .context("Lookup server failed")
}

async fn run_publish(runtime: &Runtime) -> Result<()> {
    let config = &runtime.config;
    let snapshots = RedisSnapshotStore::connect(config.redis_url(), config.snapshot_prefix()).await?;
    let version = publish_trending(runtime.factory.as_ref(), &config.plan(), &snapshots).await?;
    println!("{version}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = HarvestConfig::from_env().context("Invalid configuration")?;

    let runtime = Runtime::start(config).await?;
    let result = match cli.command {
        Command::Sync => run_sync(&runtime).await,
        Command::Listen => run_listen(&runtime).await,
        Command::Serve => run_serve(&runtime).await,
        Command::Publish => run_publish(&runtime).await,
    };
    runtime.stop().await;

    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}
