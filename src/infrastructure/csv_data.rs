//! Offline history from `{dir}/{TICKER}.csv` files with a
//! `date,open,high,low,close,volume` header.
//!
//! Periods are measured back from the newest row in the file, not from
//! today, so a fixed export keeps producing the same windows.

use crate::domain::errors::DataError;
use crate::domain::market::{Bar, Period, Series};
use crate::domain::ports::MarketDataProvider;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvMarketDataProvider {
    dir: PathBuf,
}

impl CsvMarketDataProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.to_uppercase()))
    }
}

/// Reads every bar from one export file.
pub fn read_bars(path: &Path, ticker: &str) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| match e.kind() {
            csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                DataError::SymbolNotFound {
                    ticker: ticker.to_string(),
                }
            }
            _ => DataError::SourceUnavailable(format!("{}: {}", path.display(), e)),
        })?;

    reader
        .deserialize::<Bar>()
        .enumerate()
        .map(|(row, record)| {
            record.map_err(|e| DataError::InvalidData {
                ticker: ticker.to_string(),
                reason: format!("row {}: {}", row + 1, e),
            })
        })
        .collect()
}

/// Writes bars in the layout [`read_bars`] expects.
pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let to_io = |e: csv::Error| DataError::Io(std::io::Error::other(e.to_string()));

    let mut writer = csv::Writer::from_path(path).map_err(to_io)?;
    for bar in bars {
        writer.serialize(bar).map_err(to_io)?;
    }
    writer.flush()?;
    Ok(())
}

#[async_trait]
impl MarketDataProvider for CsvMarketDataProvider {
    async fn fetch_series(&self, ticker: &str, period: Period) -> Result<Series, DataError> {
        let path = self.path_for(ticker);
        debug!("CsvMarketDataProvider: reading {:?} for {}", path, period);

        let owned_ticker = ticker.to_string();
        let bars = tokio::task::spawn_blocking(move || read_bars(&path, &owned_ticker))
            .await
            .map_err(|e| DataError::SourceUnavailable(e.to_string()))??;

        let series = Series::new(ticker, bars)?;
        let series = match series.last_date().and_then(|last| period.start_from(last)) {
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
        "csv"
    }
}
