use crate::domain::errors::{DataError, ForecastError};
use crate::domain::market::Series;
use crate::domain::ml::{Forecast, MinMaxScaler, forecast_dates};
use std::collections::VecDeque;

/// Interface for next-value sequence models
pub trait SequenceRegressor: Send + Sync {
    /// Predict the next normalized close from a window of normalized closes
    fn predict_next(&self, window: &[f64]) -> Result<f64, ForecastError>;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// Feeds each prediction back into the window to produce `days` steps.
///
/// The window keeps its length: the oldest value is dropped as each new
/// normalized prediction is appended.
pub fn roll_forward(
    model: &dyn SequenceRegressor,
    seed_window: &[f64],
    days: usize,
) -> Result<Vec<f64>, ForecastError> {
    if seed_window.is_empty() {
        return Err(ForecastError::InferenceFailed(
            "cannot roll forward from an empty window".to_string(),
        ));
    }

    let mut window: VecDeque<f64> = seed_window.iter().copied().collect();
    let mut predictions = Vec::with_capacity(days);

    for step in 0..days {
        let next = model.predict_next(window.make_contiguous())?;
        if !next.is_finite() {
            return Err(ForecastError::InferenceFailed(format!(
                "{} produced a non-finite value at step {}",
                model.name(),
                step + 1
            )));
        }

        predictions.push(next);
        window.pop_front();
        window.push_back(next);
    }

    Ok(predictions)
}

/// Seeds a model with the most recent closes and rolls a forecast forward.
pub struct AutoregressivePredictor<'a> {
    model: &'a dyn SequenceRegressor,
    scaler: &'a MinMaxScaler,
    inference_window: usize,
}

impl<'a> AutoregressivePredictor<'a> {
    pub fn new(
        model: &'a dyn SequenceRegressor,
        scaler: &'a MinMaxScaler,
        inference_window: usize,
    ) -> Self {
        Self {
            model,
            scaler,
            inference_window,
        }
    }

    /// Uses the last `inference_window` closes of `recent` (or all of them
    /// when fewer are available) as the seed window.
    pub fn forecast(&self, recent: &Series, days: usize) -> Result<Forecast, ForecastError> {
        let last_date = recent.last_date().ok_or_else(|| DataError::Empty {
            ticker: recent.ticker().to_string(),
            period: "recent window".to_string(),
        })?;

        let closes = recent.closes();
        let start = closes.len().saturating_sub(self.inference_window);
        let seed = self.scaler.transform_all(&closes[start..]);

        let normalized = roll_forward(self.model, &seed, days)?;

        Ok(Forecast {
            dates: forecast_dates(last_date, days),
            prices: self.scaler.inverse_transform_all(&normalized),
        })
    }
}
