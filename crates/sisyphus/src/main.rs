//! Sisyphus -- Worker Loop (C3).
//!
//! Pops tasks off `queue:<language>` for each language this instance
//! serves, hands them to `minos::Executor`, and pushes results to
//! `queue:results`. No database access: the Submission Coordinator (in
//! vanguard) owns persistence, Sisyphus only moves tasks through the
//! dispatch queues.

mod config;
mod worker;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minos::Executor;
use olympus_common::{Queue, RedisQueue};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sisyphus=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sisyphus worker");

    let config = Config::from_env();
    tracing::info!(environment = %config.environment, languages = ?config.worker_languages, "loaded configuration");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis_pool = redis_cfg.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
    let queue: Arc<dyn Queue> = Arc::new(RedisQueue::new(redis_pool));

    let executor = Arc::new(Executor::new(config.minos.scratch_root.clone()));

    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        tracing::info!("shutdown signal received, finishing in-flight task");
        signal_cancel.cancel();
    });

    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = minos::metrics::MetricsServer::run(metrics_port).await {
            tracing::error!(error = %e, "metrics server exited");
        }
    });

    let mut handles = Vec::with_capacity(config.worker_languages.len());
    for language in config.worker_languages.clone() {
        let queue = queue.clone();
        let executor = executor.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            worker::run_language_loop(language, queue, executor, cancel).await;
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("Sisyphus shutdown complete");
    Ok(())
}
