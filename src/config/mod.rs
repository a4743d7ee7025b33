//! Configuration module for Stockcast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Server, Data Provider, Model, and Observability.
//!
//! Every sub-config reads through a lookup function so tests can supply a
//! map instead of mutating the process environment.

mod model_config;
mod observability_config;
mod provider_config;
mod server_config;

pub use model_config::ModelEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use provider_config::{DataProviderKind, ProviderEnvConfig};
pub use server_config::ServerEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Reads one variable; `None` when unset.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup backed by the process environment.
fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Parses `key` with `FromStr`, falling back to `default` when unset or blank.
pub(crate) fn parse_var<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}={:?}", key, raw)),
        None => Ok(default),
    }
}

pub(crate) fn string_var(lookup: Lookup<'_>, key: &str, default: &str) -> String {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerEnvConfig,
    pub provider: ProviderEnvConfig,
    pub model: ModelEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&env_lookup)
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_source(lookup: Lookup<'_>) -> Result<Self> {
        let server = ServerEnvConfig::from_source(lookup).context("Failed to load server config")?;
        let provider =
            ProviderEnvConfig::from_source(lookup).context("Failed to load data provider config")?;
        let model = ModelEnvConfig::from_source(lookup).context("Failed to load model config")?;
        let observability = ObservabilityEnvConfig::from_source(lookup)
            .context("Failed to load observability config")?;

        Ok(Self {
            server,
            provider,
            model,
            observability,
        })
    }
}
