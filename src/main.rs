//! Stockcast Server - LSTM price forecasts over a JSON API
//!
//! # Usage
//! ```sh
//! DATA_PROVIDER=yahoo HTTP_PORT=5000 cargo run
//! ```
//!
//! # Environment Variables
//! - `DATA_PROVIDER` - `yahoo`, `csv` or `mock` (default: yahoo)
//! - `MODEL_DIR` - Where trained artifacts are stored (default: static/models)
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)

use anyhow::{Context, Result};
use std::sync::Arc;
use stockcast::application::{ForecastService, ForecastSettings};
use stockcast::config::Config;
use stockcast::infrastructure::observability::{Metrics, MetricsReporter};
use stockcast::infrastructure::{ArtifactStore, ProviderFactory};
use stockcast::interfaces::http;
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Stockcast Server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: Provider={:?}, ModelDir={:?}, PredictTicker={}",
        config.provider.kind, config.model.model_dir, config.model.predict_ticker
    );

    tokio::fs::create_dir_all(&config.model.model_dir)
        .await
        .with_context(|| format!("Couldn't create {:?}", config.model.model_dir))?;

    let metrics = Metrics::new().context("Failed to register metrics")?;
    let provider = ProviderFactory::create_provider(&config.provider);
    let store = ArtifactStore::new(config.model.model_dir.clone());
    if !store.exists() {
        warn!("No trained model in {:?} yet; POST /train first", store.dir());
    }

    let service = Arc::new(ForecastService::new(
        provider,
        store,
        ForecastSettings::from(&config.model),
        metrics.clone(),
    ));

    if config.observability.enabled {
        let reporter =
            MetricsReporter::new(service.clone(), metrics, config.observability.interval_secs);
        tokio::spawn(async move {
            reporter.run().await;
        });
        info!(
            "Metrics reporter started (interval: {}s)",
            config.observability.interval_secs
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    let router = http::router(service, &config.server.static_dir);

    let address = config.server.socket_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Couldn't bind to {}", address))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Http server failed")?;

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
