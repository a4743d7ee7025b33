use crate::domain::errors::DataError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of OHLCV values for a single ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Date-ordered daily bars for one ticker.
///
/// Construction sorts by date and rejects duplicate dates or non-finite
/// closes, so every consumer can rely on a clean, ascending close column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    ticker: String,
    bars: Vec<Bar>,
}

impl Series {
    pub fn new(ticker: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, DataError> {
        let ticker = ticker.into();
        bars.sort_by_key(|bar| bar.date);

        if let Some(pair) = bars.windows(2).find(|pair| pair[0].date == pair[1].date) {
            return Err(DataError::InvalidData {
                ticker,
                reason: format!("duplicate bar for {}", pair[0].date),
            });
        }

        if let Some(bar) = bars.iter().find(|bar| !bar.close.is_finite()) {
            return Err(DataError::InvalidData {
                ticker,
                reason: format!("non-finite close on {}", bar.date),
            });
        }

        Ok(Self { ticker, bars })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The close column, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|bar| bar.date)
    }

    /// Keeps only bars on or after `start`.
    pub fn since(self, start: NaiveDate) -> Self {
        Self {
            ticker: self.ticker,
            bars: self
                .bars
                .into_iter()
                .filter(|bar| bar.date >= start)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> Bar {
        Bar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn test_series_sorts_bars_by_date() {
        let series = Series::new(
            "AAPL",
            vec![bar("2024-01-03", 3.0), bar("2024-01-01", 1.0), bar("2024-01-02", 2.0)],
        )
        .unwrap();

        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(
            series.last_date(),
            NaiveDate::from_ymd_opt(2024, 1, 3)
        );
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let result = Series::new("AAPL", vec![bar("2024-01-01", 1.0), bar("2024-01-01", 2.0)]);

        match result {
            Err(DataError::InvalidData { ticker, reason }) => {
                assert_eq!(ticker, "AAPL");
                assert!(reason.contains("2024-01-01"));
            }
            other => panic!("expected InvalidData, got {:?}", other),
        }
    }

    #[test]
    fn test_series_rejects_nan_close() {
        let result = Series::new("AAPL", vec![bar("2024-01-01", f64::NAN)]);
        assert!(matches!(result, Err(DataError::InvalidData { .. })));
    }

    #[test]
    fn test_since_filters_older_bars() {
        let series = Series::new(
            "MSFT",
            vec![bar("2024-01-01", 1.0), bar("2024-01-05", 2.0), bar("2024-01-09", 3.0)],
        )
        .unwrap();

        let recent = series.since(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(recent.len(), 2);
        assert_eq!(recent.ticker(), "MSFT");
    }

    #[test]
    fn test_bar_serializes_date_as_iso_day() {
        let json = serde_json::to_value(bar("2024-03-15", 10.5)).unwrap();
        assert_eq!(json["date"], "2024-03-15");
        assert_eq!(json["close"], 10.5);
        assert_eq!(json["volume"], 1000);
    }
}
