//! Prometheus metrics definitions for Stockcast
//!
//! All metrics use the `stockcast_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the forecasting service
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Training runs by outcome
    pub train_runs_total: CounterVec,
    /// Prediction requests by outcome
    pub predict_requests_total: CounterVec,
    /// History requests by outcome
    pub history_requests_total: CounterVec,
    /// Wall time of a full training run (download + fit + persist)
    pub training_duration_seconds: HistogramVec,
    /// Training loss of the last completed epoch
    pub last_train_loss: GenericGauge<AtomicF64>,
    /// Validation loss of the last completed epoch
    pub last_val_loss: GenericGauge<AtomicF64>,
    /// 1 when a model is resident in memory
    pub model_loaded: GenericGauge<AtomicF64>,
    /// Market data fetch latency by provider and operation
    pub provider_latency_seconds: HistogramVec,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let train_runs_total = CounterVec::new(
            Opts::new("stockcast_train_runs_total", "Training runs by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(train_runs_total.clone()))?;

        let predict_requests_total = CounterVec::new(
            Opts::new(
                "stockcast_predict_requests_total",
                "Prediction requests by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(predict_requests_total.clone()))?;

        let history_requests_total = CounterVec::new(
            Opts::new(
                "stockcast_history_requests_total",
                "History requests by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(history_requests_total.clone()))?;

        let training_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "stockcast_training_duration_seconds",
                "Training run duration in seconds",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
            &["ticker"],
        )?;
        registry.register(Box::new(training_duration_seconds.clone()))?;

        let last_train_loss = Gauge::with_opts(Opts::new(
            "stockcast_last_train_loss",
            "Final-epoch training MSE of the served model",
        ))?;
        registry.register(Box::new(last_train_loss.clone()))?;

        let last_val_loss = Gauge::with_opts(Opts::new(
            "stockcast_last_val_loss",
            "Final-epoch validation MSE of the served model",
        ))?;
        registry.register(Box::new(last_val_loss.clone()))?;

        let model_loaded = Gauge::with_opts(Opts::new(
            "stockcast_model_loaded",
            "Whether a trained model is resident (0/1)",
        ))?;
        registry.register(Box::new(model_loaded.clone()))?;

        let provider_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "stockcast_provider_latency_seconds",
                "Market data fetch latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["provider", "operation"],
        )?;
        registry.register(Box::new(provider_latency_seconds.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "stockcast_uptime_seconds",
            "Server uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            train_runs_total,
            predict_requests_total,
            history_requests_total,
            training_duration_seconds,
            last_train_loss,
            last_val_loss,
            model_loaded,
            provider_latency_seconds,
            uptime_seconds,
        })
    }

    pub fn inc_train(&self, outcome: &str) {
        self.train_runs_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_predict(&self, outcome: &str) {
        self.predict_requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn inc_history(&self, outcome: &str) {
        self.history_requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Observe market data latency
    pub fn observe_provider_latency(&self, provider: &str, operation: &str, latency: f64) {
        self.provider_latency_seconds
            .with_label_values(&[provider, operation])
            .observe(latency);
    }

    /// Record the losses of a freshly served model. Missing values reset to 0.
    pub fn set_model_losses(&self, train: Option<f64>, val: Option<f64>) {
        self.last_train_loss.set(train.unwrap_or(0.0));
        self.last_val_loss.set(val.unwrap_or(0.0));
    }
}
