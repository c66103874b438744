use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use collision_risk::{config::AppConfig, server, FieldRegistry, ModelSlot, Predictor};

// Single-threaded on purpose: predictions run to completion one at a time.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env()?;

    let registry = FieldRegistry::canonical();
    registry.validate().context("field registry self-check failed")?;
    tracing::info!("field registry ok; {} fields", registry.len());

    let slot = ModelSlot::load(&cfg.model_path, registry.len());
    match &slot {
        ModelSlot::Ready(m) => tracing::info!("loaded model '{}' from {}", m.name(), cfg.model_path.display()),
        ModelSlot::Unavailable { path, reason } => {
            tracing::error!("could not load model from {}: {}; every prediction will fail", path, reason)
        }
    }

    let mut predictor = Predictor::new(registry, slot, cfg.convention);

    // Warmup to surface a model that cannot score our rows before the first request
    if predictor.model().is_ready() {
        match predictor.warmup() {
            Ok(raw) => tracing::info!("warmup forward ok (raw={:.4})", raw),
            Err(e) => {
                tracing::error!("warmup failed: {}; every prediction will fail", e);
                predictor.mark_unavailable(cfg.model_path.display().to_string(), e.to_string());
            }
        }
    }

    let app = server::router(Arc::new(predictor));

    tracing::info!("listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
