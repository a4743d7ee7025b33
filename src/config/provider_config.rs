//! Market data provider configuration parsing from environment variables.

use super::{Lookup, parse_var, string_var};
use anyhow::Result;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Which market data source backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProviderKind {
    Yahoo,
    Csv,
    Mock,
}

impl FromStr for DataProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(DataProviderKind::Yahoo),
            "csv" => Ok(DataProviderKind::Csv),
            "mock" => Ok(DataProviderKind::Mock),
            _ => anyhow::bail!(
                "Invalid DATA_PROVIDER: {}. Must be 'yahoo', 'csv', or 'mock'",
                s
            ),
        }
    }
}

/// Data provider environment configuration
#[derive(Debug, Clone)]
pub struct ProviderEnvConfig {
    pub kind: DataProviderKind,
    pub yahoo_base_url: String,
    pub csv_data_dir: PathBuf,
    pub mock_seed: u64,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
}

impl Default for ProviderEnvConfig {
    fn default() -> Self {
        Self {
            kind: DataProviderKind::Yahoo,
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            csv_data_dir: PathBuf::from("data"),
            mock_seed: 42,
            http_timeout_secs: 30,
            http_max_retries: 3,
        }
    }
}

impl ProviderEnvConfig {
    pub fn from_source(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        let kind = DataProviderKind::from_str(&string_var(lookup, "DATA_PROVIDER", "yahoo"))?;

        Ok(Self {
            kind,
            yahoo_base_url: string_var(lookup, "YAHOO_BASE_URL", &defaults.yahoo_base_url),
            csv_data_dir: PathBuf::from(string_var(lookup, "CSV_DATA_DIR", "data")),
            mock_seed: parse_var(lookup, "MOCK_SEED", defaults.mock_seed)?,
            http_timeout_secs: parse_var(lookup, "HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            http_max_retries: parse_var(lookup, "HTTP_MAX_RETRIES", defaults.http_max_retries)?,
        })
    }
}
