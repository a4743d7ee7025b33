use std::fmt::Display;
use thiserror::Error;

/// Errors raised while retrieving or validating market data
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("symbol not found: {ticker}")]
    SymbolNotFound { ticker: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid market data for {ticker}: {reason}")]
    InvalidData { ticker: String, reason: String },

    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("no bars returned for {ticker} over {period}")]
    Empty { ticker: String, period: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by training, prediction and history operations.
///
/// The HTTP and CLI boundaries decide how much of the cause to expose;
/// the variant itself is always preserved up to that point.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("market data unavailable: {0}")]
    DataUnavailable(#[from] DataError),

    #[error("no trained model found in {dir}")]
    ModelMissing { dir: String },

    #[error("model artifacts do not match: {0}")]
    ArtifactMismatch(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("training failed: {0}")]
    TrainingFailed(String),

    #[error("insufficient data: need at least {required} closes, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("artifact persistence failed: {0}")]
    Persistence(String),
}

impl ForecastError {
    pub fn inference(err: impl Display) -> Self {
        ForecastError::InferenceFailed(err.to_string())
    }

    pub fn training(err: impl Display) -> Self {
        ForecastError::TrainingFailed(err.to_string())
    }

    pub fn persistence(err: impl Display) -> Self {
        ForecastError::Persistence(err.to_string())
    }

    pub fn mismatch(err: impl Display) -> Self {
        ForecastError::ArtifactMismatch(err.to_string())
    }

    /// Short, stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::DataUnavailable(_) => "data_unavailable",
            ForecastError::ModelMissing { .. } => "model_missing",
            ForecastError::ArtifactMismatch(_) => "artifact_mismatch",
            ForecastError::InferenceFailed(_) => "inference_failed",
            ForecastError::TrainingFailed(_) => "training_failed",
            ForecastError::InsufficientData { .. } => "insufficient_data",
            ForecastError::InvalidRequest(_) => "invalid_request",
            ForecastError::Persistence(_) => "persistence",
        }
    }
}
