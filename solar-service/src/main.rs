use anyhow::{Context, Result};
use solar_service::{
    api::{self, AppState},
    backend::{MemoryBackend, PostgresBackend, SolarBackend},
    config::{AppConfig, BackendKind},
    metrics_server, observability,
};
use std::{sync::Arc, time::Duration};

async fn build_backend(cfg: &AppConfig) -> Result<Arc<dyn SolarBackend>> {
    match cfg.backend.kind {
        BackendKind::Memory => {
            let dataset = cfg.dataset.clone();
            let backend = tokio::task::spawn_blocking(move || MemoryBackend::load(&dataset))
                .await?
                .with_context(|| {
                    format!("failed to load dataset '{}'", cfg.dataset.csv_path.display())
                })?;
            let backend = Arc::new(backend);

            if cfg.dataset.reload_interval_secs > 0 {
                backend
                    .clone()
                    .spawn_reload(Duration::from_secs(cfg.dataset.reload_interval_secs));
                tracing::info!(
                    every_secs = cfg.dataset.reload_interval_secs,
                    "background dataset reload enabled"
                );
            }
            Ok(backend)
        }
        BackendKind::Postgres => {
            let backend = PostgresBackend::connect(cfg.postgres()?)
                .await
                .context("failed to connect to PostgreSQL")?;
            Ok(Arc::new(backend))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let backend = build_backend(&cfg).await?;
    let cors = api::cors_layer(&cfg.server.cors_allowed_origin)
        .with_context(|| format!("invalid CORS origin '{}'", cfg.server.cors_allowed_origin))?;
    let app = api::router(AppState::new(backend), cors);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind_addr))?;
    tracing::info!(addr = %cfg.server.bind_addr, backend = ?cfg.backend.kind, "solar API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
