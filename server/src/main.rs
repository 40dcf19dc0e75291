//! Box Office HTTP server.
//!
//! Sells event tickets by delegating checkout to the partner that owns each
//! event, with spot holds kept in `PostgreSQL`.

use anyhow::Context;
use boxoffice_core::environment::SystemClock;
use boxoffice_partners::PartnerFactory;
use boxoffice_postgres::PostgresSpotStore;
use boxoffice_runtime::ReservationSweeper;
use boxoffice_runtime::metrics::{
    PURCHASE_DURATION_BUCKETS, PURCHASE_DURATION_SECONDS, describe_metrics,
};
use boxoffice_server::{AppState, Config, build_router};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boxoffice=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Box Office server");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        partners = config.partners.endpoints.len(),
        max_spots = config.orchestrator.max_spots,
        "Configuration loaded"
    );

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.server.metrics_port))
        .set_buckets_for_metric(
            Matcher::Full(PURCHASE_DURATION_SECONDS.to_string()),
            PURCHASE_DURATION_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;
    describe_metrics();
    info!(port = config.server.metrics_port, "Prometheus metrics exporter listening");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.connect_timeout)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let store = Arc::new(PostgresSpotStore::new(pool));
    store.migrate().await?;
    info!("Database ready");

    let factory = Arc::new(PartnerFactory::from_config(&config.partners)?);

    let (sweeper, sweeper_shutdown) =
        ReservationSweeper::new(Arc::clone(&store), Arc::new(SystemClock), config.sweeper);
    let sweeper_task = sweeper.spawn();

    let app = build_router(AppState::new(store, factory, config.orchestrator.clone()));
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, waiting for background tasks");
    let _ = sweeper_shutdown.send(true);
    match tokio::time::timeout(config.server.shutdown_timeout, sweeper_task).await {
        Ok(Ok(())) => {}
        Ok(Err(join_error)) => error!(error = %join_error, "Reservation sweeper panicked"),
        Err(_) => warn!("Reservation sweeper did not stop in time"),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal, shutting down gracefully..."),
        () = terminate => info!("Received SIGTERM signal, shutting down gracefully..."),
    }
}
