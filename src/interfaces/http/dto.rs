//! Request and response bodies of the JSON API.
//!
//! Integer fields accept JSON numbers or numeric strings, since HTML form
//! values arrive as strings.

use crate::domain::market::{Bar, Series};
use crate::domain::ml::Forecast;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct TrainBody {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub time_step: Option<usize>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub epochs: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictBody {
    #[serde(default, deserialize_with = "lenient_count")]
    pub days: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub ticker: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PredictionsDto {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
}

impl From<Forecast> for PredictionsDto {
    fn from(forecast: Forecast) -> Self {
        Self {
            dates: forecast
                .dates
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect(),
            prices: forecast.prices,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<PredictionsDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictResponse {
    pub fn ok(forecast: Forecast) -> Self {
        Self {
            success: true,
            predictions: Some(forecast.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            predictions: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BarDto {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl From<&Bar> for BarDto {
    fn from(bar: &Bar) -> Self {
        Self {
            date: bar.date.format("%Y-%m-%d").to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<BarDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryResponse {
    pub fn ok(series: &Series) -> Self {
        Self {
            success: true,
            data: Some(series.bars().iter().map(BarDto::from).collect()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Accepts `60`, `60.0`, `"60"` or `null`; rejects negatives and fractions.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer, got {}", value)))
}
