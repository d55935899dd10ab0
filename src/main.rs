//! uptime-monitor entry point.
//!
//! Starts the sweep scheduler and, unless disabled, the read-only status
//! API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use uptime_monitor::api;
use uptime_monitor::app_state::AppState;
use uptime_monitor::archive::LogArchive;
use uptime_monitor::config::{MonitorConfig, StoreBackend};
use uptime_monitor::notify::{LogNotifier, Notifier, TwilioNotifier};
use uptime_monitor::store::{FileRecordStore, PostgresRecordStore, RecordStore};
use uptime_monitor::worker::{Scheduler, WorkerContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = MonitorConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        backend = ?config.store_backend,
        logs_dir = %config.logs_dir.display(),
        "starting uptime-monitor"
    );

    // Build collaborators
    let store = open_store(&config).await?;
    let notifier: Arc<dyn Notifier> = match config.twilio.clone() {
        Some(twilio) => Arc::new(TwilioNotifier::new(twilio).context("sms client")?),
        None => {
            tracing::warn!("twilio not configured, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let archive = LogArchive::new(&config.logs_dir);

    let ctx = Arc::new(WorkerContext::new(
        store,
        notifier,
        archive,
        config.worker.clone(),
    )?);
    let scheduler = Scheduler::new(Arc::clone(&ctx)).start();

    if config.status_api_enabled {
        let app = Router::new()
            .merge(api::build_router())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(AppState::new(Arc::clone(&ctx)));

        let listener = tokio::net::TcpListener::bind(config.listen_addr)
            .await
            .with_context(|| format!("binding {}", config.listen_addr))?;
        tracing::info!(addr = %config.listen_addr, "status api listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        shutdown_signal().await;
    }

    scheduler.shutdown().await;
    Ok(())
}

async fn open_store(config: &MonitorConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::Fs => Ok(Arc::new(FileRecordStore::new(&config.data_dir))),
        StoreBackend::Postgres => {
            let store = PostgresRecordStore::connect(
                &config.database_url,
                config.database_max_connections,
                config.database_min_connections,
                Duration::from_secs(config.database_connect_timeout_secs),
            )
            .await
            .context("connecting to postgres")?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
