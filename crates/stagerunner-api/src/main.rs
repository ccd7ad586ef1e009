//! stagerunner API server

use anyhow::Context;
use clap::Parser;
use stagerunner_api::{AppState, routes};
use stagerunner_config::{ServerConfig, load_system_config};
use stagerunner_db::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Start the stagerunner API server.
#[derive(Parser, Debug)]
#[command(name = "stagerunner-server", version, about)]
struct Args {
    /// KDL configuration file
    #[arg(long, env = "STAGERUNNER_CONFIG")]
    config: Option<PathBuf>,

    /// Server address to listen on
    #[arg(long, env = "STAGERUNNER_ADDR")]
    addr: Option<String>,

    /// Number of workers executing pipeline runs
    #[arg(long, env = "STAGERUNNER_WORKERS")]
    workers: Option<usize>,

    /// Size of the pipeline run queue
    #[arg(long, visible_alias = "qs", env = "STAGERUNNER_QUEUE_SIZE")]
    queue_size: Option<usize>,

    /// Maximum number of queued runs per pipeline
    #[arg(long, visible_alias = "pp", env = "STAGERUNNER_PER_PIPELINE_QUEUE")]
    per_pipeline_queue: Option<usize>,

    /// Simulated duration of every stage, in seconds
    #[arg(long, visible_alias = "delay", env = "STAGERUNNER_EXECUTOR_DELAY")]
    executor_delay: Option<u64>,

    /// Probability of a stage failing
    #[arg(long, visible_alias = "fp", env = "STAGERUNNER_FAIL_PROBABILITY")]
    fail_probability: Option<f64>,

    /// Interval for polling the queue and busy pipelines, in milliseconds
    #[arg(long, env = "STAGERUNNER_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,
}

impl Args {
    /// Defaults, then the config file, then flags and environment.
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_system_config(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ServerConfig::default(),
        };

        let scheduler = &mut config.scheduler;
        if let Some(addr) = self.addr {
            config.addr = addr;
        }
        if let Some(workers) = self.workers {
            scheduler.workers = workers;
        }
        if let Some(queue_size) = self.queue_size {
            scheduler.queue_size = queue_size;
        }
        if let Some(per_pipeline) = self.per_pipeline_queue {
            scheduler.max_queued_per_pipeline = per_pipeline;
        }
        if let Some(delay) = self.executor_delay {
            scheduler.stage_delay = Duration::from_secs(delay);
        }
        if let Some(rate) = self.fail_probability {
            scheduler.failure_rate = rate;
        }
        if let Some(ms) = self.poll_interval_ms {
            scheduler.poll_interval = Duration::from_millis(ms);
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    let addr = config.socket_addr()?;

    let store = Arc::new(MemoryStore::new());
    let state = AppState::from_config(store, &config.scheduler);
    let orchestrator = state.orchestrator.clone();

    let cancel = CancellationToken::new();
    // The dispatcher only returns on shutdown or a fatal error; either way
    // the HTTP server stops with it.
    let dispatcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = orchestrator.start(cancel.clone()).await;
            cancel.cancel();
            result
        })
    };

    // Build router
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!(
        %addr,
        workers = config.scheduler.workers,
        queue_size = config.scheduler.queue_size,
        per_pipeline_queue = config.scheduler.max_queued_per_pipeline,
        "Starting server"
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = shutdown.cancelled() => {}
            }
        })
        .await?;

    cancel.cancel();
    match dispatcher.await {
        Ok(Ok(())) => {
            info!("Server stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Dispatcher failed");
            Err(e.into())
        }
        Err(e) => Err(anyhow::anyhow!("dispatcher task failed: {}", e)),
    }
}
