//! Foodgram API Gateway
//!
//! Binary entry point: configuration, logging, database, metrics exporter
//! and the HTTP server with graceful shutdown.

use foodgram_common::{
    auth::JwtManager,
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    media::FsImageStore,
    metrics,
};
use foodgram_gateway::{create_router, AppState};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting Foodgram API Gateway v{}", foodgram_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        let handle = install_prometheus()?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    let jwt_secret = config.auth.jwt_secret.clone().ok_or_else(|| {
        anyhow::anyhow!("auth.jwt_secret is not set (APP__AUTH__JWT_SECRET)")
    })?;

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        db.migrate().await?;
    }

    let images = FsImageStore::from_config(&config.media);
    tokio::fs::create_dir_all(images.root()).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        jwt: Arc::new(JwtManager::new(&jwt_secret, config.auth.jwt_expiration_secs)),
        images: Arc::new(images),
        metrics: metrics_handle,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .install_recorder()?;
    Ok(handle)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
