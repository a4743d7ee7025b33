//! Push-based observability for Stockcast
//!
//! Metrics are recorded in a Prometheus registry and pushed as structured
//! JSON log lines (`METRICS_JSON:` prefix) on a fixed interval, ready for
//! Loki, Fluentd or CloudWatch. Nothing here listens for requests.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
