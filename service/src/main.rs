//! Service entry point: configuration, logging, the runtime and the
//! listener.
//!
//! The runtime is built by hand so the worker pool size can come from
//! configuration; everything after that is one `axum::serve` with graceful
//! shutdown on Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use niddgate_service::carrier::ThingSpaceClient;
use niddgate_service::firmware::RemoteArtifactSource;
use niddgate_service::middleware::cache::CacheClient;
use niddgate_service::routes::{AppState, router};
use niddgate_service::settings::Settings;

/// Initialize structured logging with tracing.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

async fn run(settings: Settings) -> Result<()> {
    let cache = CacheClient::redis(&settings.redis_url)
        .with_context(|| format!("invalid redis url {}", settings.redis_url))?;
    let carrier = Arc::new(ThingSpaceClient::new(settings.carrier_account()));
    let artifacts = Arc::new(RemoteArtifactSource::new(settings.firmware_url.clone()));

    let listen_addr = settings.listen_addr.clone();
    let state = AppState {
        settings: Arc::new(settings),
        cache,
        carrier,
        artifacts,
    };

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("gateway stopped");
    Ok(())
}

fn main() -> Result<()> {
    let settings = Settings::parse();
    init_logging();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if settings.worker_threads > 0 {
        builder.worker_threads(settings.worker_threads);
    }
    let runtime = builder
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime.block_on(run(settings))
}
