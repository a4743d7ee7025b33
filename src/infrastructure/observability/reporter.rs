//! Push-based metrics reporter for Stockcast
//!
//! Periodically outputs a metrics snapshot as structured JSON to stdout.

use crate::application::{ForecastService, ModelStatus};
use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub provider: String,
    pub model: ModelStatus,
}

/// Push-based metrics reporter
///
/// Outputs metrics as structured JSON logs on a configurable interval.
/// No HTTP server, no incoming connections.
pub struct MetricsReporter {
    service: Arc<ForecastService>,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(service: Arc<ForecastService>, metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            service,
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot().await;
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    // Prefix lets log shippers filter metric lines
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Model loaded: {} | Ticker: {} | Uptime: {}s",
                        snapshot.model.loaded,
                        snapshot.model.ticker.as_deref().unwrap_or("-"),
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    async fn collect_snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        let model = self.service.status().await;

        self.metrics.uptime_seconds.set(uptime as f64);
        self.metrics
            .model_loaded
            .set(if model.loaded { 1.0 } else { 0.0 });

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            provider: self.service.provider_name().to_string(),
            model,
        }
    }
}
