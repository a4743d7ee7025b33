//! HTTP server configuration parsing from environment variables.

use super::{Lookup, parse_var, string_var};
use anyhow::Result;
use std::path::PathBuf;

/// Server environment configuration
#[derive(Debug, Clone)]
pub struct ServerEnvConfig {
    pub bind_address: String,
    pub port: u16,
    /// Directory holding `index.html` and other static assets
    pub static_dir: PathBuf,
}

impl Default for ServerEnvConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ServerEnvConfig {
    pub fn from_source(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            bind_address: string_var(lookup, "HTTP_BIND_ADDRESS", &defaults.bind_address),
            port: parse_var(lookup, "HTTP_PORT", defaults.port)?,
            static_dir: PathBuf::from(string_var(lookup, "STATIC_DIR", "static")),
        })
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
