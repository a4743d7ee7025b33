// Model training, persistence format and autoregressive inference
pub mod ml;

// Request orchestration around the shared model slot
pub mod forecast_service;

pub use forecast_service::{ForecastService, ForecastSettings, ModelStatus, TrainOutcome};
