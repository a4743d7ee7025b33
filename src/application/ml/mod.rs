pub mod lstm;
pub mod predictor;
pub mod trainer;

use crate::domain::errors::ForecastError;
use crate::domain::ml::{MinMaxScaler, ModelManifest};
use crate::infrastructure::persistence::artifact_store::StoredArtifacts;
use lstm::LstmForecaster;

/// Model, normalization state and manifest of one training run, as served.
pub struct LoadedModel {
    pub model: LstmForecaster,
    pub scaler: MinMaxScaler,
    pub manifest: ModelManifest,
}

impl LoadedModel {
    /// Rebuilds the network from verified artifacts.
    pub fn from_artifacts(stored: StoredArtifacts) -> Result<Self, ForecastError> {
        Ok(Self {
            model: LstmForecaster::from_safetensors(&stored.weights)?,
            scaler: stored.scaler,
            manifest: stored.manifest,
        })
    }
}
