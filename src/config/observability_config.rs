//! Observability configuration parsing from environment variables.
//!
//! This module handles loading the periodic metrics reporter settings.

use super::{Lookup, parse_var};
use anyhow::Result;

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    /// Seconds between two `METRICS_JSON` log lines
    pub interval_secs: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_source(lookup: Lookup<'_>) -> Result<Self> {
        let interval_secs = parse_var(lookup, "OBSERVABILITY_INTERVAL", 60u64)?.max(1);
        Ok(Self {
            enabled: lookup("OBSERVABILITY_ENABLED")
                .and_then(|v| v.trim().parse::<bool>().ok())
                .unwrap_or(true),
            interval_secs,
        })
    }
}
