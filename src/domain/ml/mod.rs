pub mod forecast;
pub mod manifest;
pub mod normalization;
pub mod windowing;

pub use forecast::{Forecast, forecast_dates};
pub use manifest::{Architecture, ModelManifest};
pub use normalization::MinMaxScaler;
pub use windowing::{TrainingPair, TrainingSet, build_training_set};
