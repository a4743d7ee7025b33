//! Sliding-window construction of supervised training pairs.

use super::normalization::MinMaxScaler;
use crate::domain::errors::ForecastError;

pub const DEFAULT_TIME_STEP: usize = 60;

/// `time_step` consecutive normalized closes and the close that follows them.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    pub window: Vec<f64>,
    pub target: f64,
}

/// Chronologically ordered training pairs sharing one window width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    time_step: usize,
    pairs: Vec<TrainingPair>,
}

impl TrainingSet {
    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn pairs(&self) -> &[TrainingPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Splits off the last `fraction` of pairs for validation.
    ///
    /// The cut happens on the ordered pairs, so validation windows are the
    /// most recent ones but may still share closes with the tail of the
    /// training windows.
    pub fn split_validation(&self, fraction: f64) -> (&[TrainingPair], &[TrainingPair]) {
        let fraction = fraction.clamp(0.0, 1.0);
        let cut = (self.pairs.len() as f64 * (1.0 - fraction)).floor() as usize;
        self.pairs.split_at(cut.min(self.pairs.len()))
    }
}

/// Emits one pair per index `i` in `[time_step, values.len())`.
pub fn sliding_windows(values: &[f64], time_step: usize) -> Vec<TrainingPair> {
    if time_step == 0 || values.len() <= time_step {
        return Vec::new();
    }

    (time_step..values.len())
        .map(|i| TrainingPair {
            window: values[i - time_step..i].to_vec(),
            target: values[i],
        })
        .collect()
}

/// Fits the normalization state on `closes` and windows the normalized column.
///
/// `time_step >= closes.len()` is not an error here: it yields an empty set
/// and the caller decides whether that is fatal.
pub fn build_training_set(
    closes: &[f64],
    time_step: usize,
) -> Result<(TrainingSet, MinMaxScaler), ForecastError> {
    if time_step == 0 {
        return Err(ForecastError::InvalidRequest(
            "time_step must be positive".to_string(),
        ));
    }

    let scaler = MinMaxScaler::fit(closes).ok_or_else(|| {
        if closes.is_empty() {
            ForecastError::InsufficientData {
                required: time_step.saturating_add(1),
                available: 0,
            }
        } else {
            ForecastError::InvalidRequest("close prices contain non-finite values".to_string())
        }
    })?;

    let normalized = scaler.transform_all(closes);
    let pairs = sliding_windows(&normalized, time_step);

    Ok((TrainingSet { time_step, pairs }, scaler))
}
