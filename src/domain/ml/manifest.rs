use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Layer layout of the forecast network. Fixed at build time; recorded in
/// every manifest so weights from a different layout are refused on load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub input_features: usize,
    pub lstm_units: [usize; 2],
    pub dense_units: usize,
    pub output_units: usize,
    pub dropout: f32,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            input_features: 1,
            lstm_units: [50, 50],
            dense_units: 25,
            output_units: 1,
            dropout: 0.2,
        }
    }
}

/// Describes one training run and binds its two artifacts together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub run_id: Uuid,
    pub ticker: String,
    pub time_step: usize,
    pub epochs: usize,
    pub training_pairs: usize,
    pub final_loss: Option<f64>,
    pub final_val_loss: Option<f64>,
    pub trained_at: DateTime<Utc>,
    pub architecture: Architecture,
    /// SHA-256 of the weights file, hex encoded
    #[serde(default)]
    pub model_sha256: String,
    /// SHA-256 of the scaler file, hex encoded
    #[serde(default)]
    pub scaler_sha256: String,
}
