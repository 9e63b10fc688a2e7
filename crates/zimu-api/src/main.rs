//! zimu server binary: HTTP API plus the background worker.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};

use zimu_ai::GeminiConfig;
use zimu_api::{create_router, logging, metrics, ApiConfig, AppState};
use zimu_media::{ImageFetcher, MediaConfig};
use zimu_queue::{JobQueue, QueueConfig};
use zimu_worker::{JobExecutor, ProcessingContext, WorkerConfig};

/// How long shutdown waits for the job in progress.
const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Existing environment variables win over .env
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = ApiConfig::from_env();
    let _log_guard = logging::init_tracing(&config);

    info!("Starting zimu");
    info!("API config: host={}, port={}", config.host, config.port);

    // Before the worker starts recording
    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    let worker_config = WorkerConfig::from_env();
    let media_config = MediaConfig::from_env();
    let gemini_config = GeminiConfig::from_env();
    if gemini_config.api_keys.is_empty() {
        warn!("No Gemini API key configured; summaries will fail until GEMINI_API_KEYS is set");
    } else {
        info!(keys = gemini_config.api_keys.len(), model = %gemini_config.model, "Gemini configured");
    }

    let ctx = Arc::new(
        ProcessingContext::new(worker_config, media_config.clone(), gemini_config)
            .context("Failed to create processing context")?,
    );

    // Tasks from a previous run are gone; their projects can never finish.
    if let Err(e) = ctx.projects.mark_interrupted().await {
        error!(error = %e, "Failed to mark interrupted projects");
    }

    let (queue, receiver) = JobQueue::new(QueueConfig::from_env());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(JobExecutor::new(Arc::clone(&ctx), receiver).run(shutdown_rx));

    let fetcher = ImageFetcher::new(&media_config).context("Failed to create image client")?;
    let state = AppState::new(config.clone(), ctx, queue, fetcher);
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = config.bind_address().parse().context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(WORKER_SHUTDOWN_GRACE, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Worker task ended abnormally"),
        Err(_) => warn!("Worker still busy after shutdown grace period, exiting anyway"),
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
