use crate::domain::errors::DataError;
use crate::domain::market::{Period, Series};
use async_trait::async_trait;

/// Source of daily OHLCV history (Yahoo, CSV files, synthetic data).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for `ticker` covering `period`, oldest first.
    /// An empty series is reported as `DataError::Empty`, never returned.
    async fn fetch_series(&self, ticker: &str, period: Period) -> Result<Series, DataError>;

    fn name(&self) -> &str;
}
