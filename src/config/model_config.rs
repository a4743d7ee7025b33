//! Training and forecasting configuration parsing from environment variables.

use super::{Lookup, parse_var, string_var};
use crate::domain::market::Period;
use crate::domain::ml::forecast::DEFAULT_FORECAST_DAYS;
use crate::domain::ml::windowing::DEFAULT_TIME_STEP;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Model environment configuration
#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    /// Where `lstm_model.safetensors`, `scaler.json` and `manifest.json` live
    pub model_dir: PathBuf,

    // Training defaults
    pub default_ticker: String,
    pub default_time_step: usize,
    pub max_time_step: usize,
    pub default_epochs: usize,
    pub train_period: Period,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub seed: u64,

    // Prediction
    pub predict_ticker: String,
    pub predict_lookback: Period,
    pub inference_window: usize,
    pub default_forecast_days: usize,
    pub max_forecast_days: usize,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("static/models"),
            default_ticker: "AAPL".to_string(),
            default_time_step: DEFAULT_TIME_STEP,
            max_time_step: 1_000,
            default_epochs: 50,
            train_period: Period::Years(5),
            batch_size: 64,
            learning_rate: 0.001,
            validation_split: 0.2,
            seed: 42,
            predict_ticker: "AAPL".to_string(),
            predict_lookback: Period::Days(60),
            inference_window: DEFAULT_TIME_STEP,
            default_forecast_days: DEFAULT_FORECAST_DAYS,
            max_forecast_days: 365,
        }
    }
}

impl ModelEnvConfig {
    pub fn from_source(lookup: Lookup<'_>) -> Result<Self> {
        let d = Self::default();

        let train_period = Period::from_str(&string_var(lookup, "TRAIN_PERIOD", "5y"))
            .context("Failed to parse TRAIN_PERIOD")?;
        let predict_lookback = Period::from_str(&string_var(lookup, "PREDICT_LOOKBACK", "60d"))
            .context("Failed to parse PREDICT_LOOKBACK")?;

        let config = Self {
            model_dir: PathBuf::from(string_var(lookup, "MODEL_DIR", "static/models")),
            default_ticker: string_var(lookup, "DEFAULT_TICKER", &d.default_ticker).to_uppercase(),
            default_time_step: parse_var(lookup, "DEFAULT_TIME_STEP", d.default_time_step)?,
            max_time_step: parse_var(lookup, "MAX_TIME_STEP", d.max_time_step)?,
            default_epochs: parse_var(lookup, "DEFAULT_EPOCHS", d.default_epochs)?,
            train_period,
            batch_size: parse_var(lookup, "TRAIN_BATCH_SIZE", d.batch_size)?,
            learning_rate: parse_var(lookup, "LEARNING_RATE", d.learning_rate)?,
            validation_split: parse_var(lookup, "VALIDATION_SPLIT", d.validation_split)?,
            seed: parse_var(lookup, "TRAIN_SEED", d.seed)?,
            predict_ticker: string_var(lookup, "PREDICT_TICKER", &d.predict_ticker).to_uppercase(),
            predict_lookback,
            inference_window: parse_var(lookup, "INFERENCE_WINDOW", d.inference_window)?,
            default_forecast_days: parse_var(
                lookup,
                "DEFAULT_FORECAST_DAYS",
                d.default_forecast_days,
            )?,
            max_forecast_days: parse_var(lookup, "MAX_FORECAST_DAYS", d.max_forecast_days)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.default_time_step == 0 || self.inference_window == 0 {
            anyhow::bail!("DEFAULT_TIME_STEP and INFERENCE_WINDOW must be positive");
        }
        if self.default_time_step > self.max_time_step {
            anyhow::bail!(
                "DEFAULT_TIME_STEP ({}) exceeds MAX_TIME_STEP ({})",
                self.default_time_step,
                self.max_time_step
            );
        }
        if self.batch_size == 0 {
            anyhow::bail!("TRAIN_BATCH_SIZE must be positive");
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            anyhow::bail!(
                "VALIDATION_SPLIT must be in [0, 1), got {}",
                self.validation_split
            );
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            anyhow::bail!("LEARNING_RATE must be positive, got {}", self.learning_rate);
        }
        if self.default_forecast_days > self.max_forecast_days {
            anyhow::bail!(
                "DEFAULT_FORECAST_DAYS ({}) exceeds MAX_FORECAST_DAYS ({})",
                self.default_forecast_days,
                self.max_forecast_days
            );
        }
        Ok(())
    }
}
