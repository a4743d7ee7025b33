use crate::domain::errors::DataError;
use crate::domain::market::{Bar, Period, Series};
use crate::domain::ports::MarketDataProvider;
use async_trait::async_trait;
use chrono::{Datelike, Months, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Years of synthetic history behind `Period::Max`.
const MAX_HISTORY_YEARS: u32 = 10;

/// Deterministic random-walk prices for offline runs and tests.
///
/// The walk for a ticker depends only on the seed, the ticker and the
/// anchor date, so overlapping periods agree on every shared day.
#[derive(Debug, Clone)]
pub struct MockMarketDataProvider {
    seed: u64,
    anchor: Option<NaiveDate>,
}

impl MockMarketDataProvider {
    /// History ends today.
    pub fn new(seed: u64) -> Self {
        Self { seed, anchor: None }
    }

    /// History ends on `anchor`, independent of the wall clock.
    pub fn anchored(seed: u64, anchor: NaiveDate) -> Self {
        Self {
            seed,
            anchor: Some(anchor),
        }
    }

    fn anchor(&self) -> NaiveDate {
        self.anchor.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn ticker_seed(&self, ticker: &str) -> u64 {
        ticker
            .bytes()
            .fold(self.seed, |acc, b| acc.rotate_left(7) ^ u64::from(b))
    }

    /// Weekday bars from `MAX_HISTORY_YEARS` before the anchor up to it.
    pub fn generate(&self, ticker: &str) -> Vec<Bar> {
        let end = self.anchor();
        let Some(origin) = end.checked_sub_months(Months::new(MAX_HISTORY_YEARS * 12)) else {
            return Vec::new();
        };

        let mut rng = StdRng::seed_from_u64(self.ticker_seed(ticker));
        let mut close: f64 = rng.random_range(20.0..400.0);
        let drift = rng.random_range(-0.0002..0.0006);

        origin
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
            .map(|date| {
                let open = close;
                let change: f64 = drift + rng.random_range(-0.02..0.02);
                close = (open * (1.0 + change)).max(1.0);
                let spread = open.max(close) * rng.random_range(0.0..0.01);
                Bar {
                    date,
                    open,
                    high: open.max(close) + spread,
                    low: (open.min(close) - spread).max(0.5),
                    close,
                    volume: rng.random_range(1_000_000..50_000_000),
                }
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    async fn fetch_series(&self, ticker: &str, period: Period) -> Result<Series, DataError> {
        let series = Series::new(ticker, self.generate(ticker))?;
        let series = match period.start_from(self.anchor()) {
            Some(start) => series.since(start),
            None => series,
        };

        if series.is_empty() {
            return Err(DataError::Empty {
                ticker: ticker.to_string(),
                period: period.to_string(),
            });
        }
        Ok(series)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[tokio::test]
    async fn test_same_seed_same_prices() {
        let a = MockMarketDataProvider::anchored(7, anchor());
        let b = MockMarketDataProvider::anchored(7, anchor());

        let sa = a.fetch_series("AAPL", Period::Years(1)).await.unwrap();
        let sb = b.fetch_series("AAPL", Period::Years(1)).await.unwrap();
        assert_eq!(sa, sb);
    }

    #[tokio::test]
    async fn test_tickers_walk_independently() {
        let provider = MockMarketDataProvider::anchored(7, anchor());
        let aapl = provider.fetch_series("AAPL", Period::Months(1)).await.unwrap();
        let msft = provider.fetch_series("MSFT", Period::Months(1)).await.unwrap();
        assert_ne!(aapl.closes(), msft.closes());
    }

    #[tokio::test]
    async fn test_periods_overlap_consistently() {
        let provider = MockMarketDataProvider::anchored(42, anchor());
        let long = provider.fetch_series("AAPL", Period::Years(5)).await.unwrap();
        let short = provider.fetch_series("AAPL", Period::Days(60)).await.unwrap();

        assert!(long.len() > short.len());
        assert_eq!(long.last_date(), short.last_date());
        assert_eq!(long.bars()[long.len() - 1], short.bars()[short.len() - 1]);
    }

    #[tokio::test]
    async fn test_bars_are_weekdays_with_sane_ohlc() {
        let provider = MockMarketDataProvider::anchored(1, anchor());
        let series = provider.fetch_series("TSLA", Period::Max).await.unwrap();

        assert!(series.len() > 2_000);
        for bar in series.bars() {
            assert!(!matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun));
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.close > 0.0);
        }
    }
}
