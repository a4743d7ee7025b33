//! Turns a downloaded series into a fitted model plus its normalization state.

use super::lstm::{FitParams, FitReport, LstmForecaster};
use crate::domain::errors::ForecastError;
use crate::domain::market::Series;
use crate::domain::ml::{Architecture, MinMaxScaler, ModelManifest, build_training_set};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Parameters a caller may choose per training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRequest {
    pub ticker: String,
    pub time_step: usize,
    pub epochs: usize,
}

/// Output of one training run, not yet persisted.
pub struct TrainedModel {
    pub model: LstmForecaster,
    pub scaler: MinMaxScaler,
    pub report: FitReport,
    /// Digests are filled in when the artifacts are written.
    pub manifest: ModelManifest,
}

/// Normalizes the closes of `series`, windows them and fits a fresh network.
///
/// `request.epochs` overrides `params.epochs`. Fewer than `time_step + 1`
/// closes is reported as insufficient data before any fitting happens.
pub fn train_on_series(
    series: &Series,
    request: &TrainRequest,
    params: &FitParams,
) -> Result<TrainedModel, ForecastError> {
    if request.epochs == 0 {
        return Err(ForecastError::InvalidRequest(
            "epochs must be positive".to_string(),
        ));
    }

    let closes = series.closes();
    let (set, scaler) = build_training_set(&closes, request.time_step)?;
    if set.is_empty() {
        return Err(ForecastError::InsufficientData {
            required: request.time_step.saturating_add(1),
            available: closes.len(),
        });
    }

    info!(
        "Trainer: fitting {} on {} closes ({} windows of {}) for {} epochs",
        request.ticker,
        closes.len(),
        set.len(),
        request.time_step,
        request.epochs
    );

    let params = FitParams {
        epochs: request.epochs,
        ..params.clone()
    };
    let (model, report) = LstmForecaster::fit(&set, &params)?;

    let manifest = ModelManifest {
        run_id: Uuid::new_v4(),
        ticker: request.ticker.clone(),
        time_step: request.time_step,
        epochs: request.epochs,
        training_pairs: set.len(),
        final_loss: report.final_loss(),
        final_val_loss: report.final_val_loss(),
        trained_at: Utc::now(),
        architecture: Architecture::default(),
        model_sha256: String::new(),
        scaler_sha256: String::new(),
    };

    Ok(TrainedModel {
        model,
        scaler,
        report,
        manifest,
    })
}
