//! Process startup and shutdown helpers.

use meridian_config::AppConfig;
use meridian_core::{MeridianError, MeridianResult};
use meridian_queue::{create_pool, JobExecutor, QueueManager, RedisStore};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Start the Prometheus scrape endpoint if metrics are enabled.
pub fn install_metrics_exporter(config: &AppConfig) -> MeridianResult<()> {
    let observability = &config.observability;
    if !observability.metrics_enabled {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr: SocketAddr = observability.metrics_addr.parse().map_err(|e| {
        MeridianError::Configuration(format!(
            "Invalid metrics address '{}': {}",
            observability.metrics_addr, e
        ))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MeridianError::Internal(format!("Failed to install metrics exporter: {}", e)))?;

    info!("Metrics available at http://{}/metrics", addr);
    Ok(())
}

/// Connect to Redis and build a queue manager over it.
pub async fn build_manager(
    config: &AppConfig,
    executor: Arc<dyn JobExecutor>,
) -> MeridianResult<QueueManager> {
    let pool = create_pool(&config.redis).await?;
    let store = Arc::new(RedisStore::new(pool));
    Ok(QueueManager::new(store, executor, config))
}

/// Logs the effective settings once at startup.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Environment:    {}", config.app.environment);
    info!("Redis:          {}", config.redis.url);
    info!("Key prefix:     {}", config.redis.key_prefix);
    info!("Workers:        {}", config.workers.count);
    info!("Max queue size: {}", config.queue.max_queue_size);
    info!("{}", separator);
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
