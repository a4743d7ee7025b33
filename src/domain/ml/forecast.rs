use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FORECAST_DAYS: usize = 30;

/// Multi-day price forecast, one entry per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.prices.iter().copied())
    }
}

/// `days` consecutive calendar days strictly after `last_observed`.
///
/// Weekends and exchange holidays are not skipped.
pub fn forecast_dates(last_observed: NaiveDate, days: usize) -> Vec<NaiveDate> {
    last_observed.iter_days().skip(1).take(days).collect()
}
