use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchlog_tracker::config::TrackerConfig;
use watchlog_tracker::store::PgStore;
use watchlog_tracker::{refresh, Tracker};
use watchlog_youtube::YouTubeApi;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watchlog_tracker=debug,watchlog_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = TrackerConfig::from_env().expect("Invalid worker configuration");
    tracing::info!(
        refresh_interval_secs = config.refresh_interval_secs,
        refresh_batch_size = config.refresh_batch_size,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = watchlog_db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    watchlog_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    watchlog_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Tracker ---
    let provider = YouTubeApi::new(config.youtube_api_key.clone(), config.youtube_api_url.clone());
    let tracker = Arc::new(Tracker::new(PgStore::new(pool.clone()), provider));

    // --- Metadata refresh ---
    let cancel = CancellationToken::new();
    let refresh_handle = tokio::spawn(refresh::run(
        Arc::clone(&tracker),
        config.refresh_interval(),
        config.refresh_batch_size,
        cancel.clone(),
    ));

    shutdown_signal().await;

    cancel.cancel();
    let _ = refresh_handle.await;
    tracing::info!("Metadata refresh job stopped");

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
