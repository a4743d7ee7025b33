//! Yahoo Finance v8 chart API: URL construction and response parsing.
//!
//! Yahoo has no official API and changes its format without notice, so
//! every structural surprise is reported as `ResponseFormatChanged`.

use crate::domain::errors::DataError;
use crate::domain::market::{Bar, Period};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartResult,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub result: Option<Vec<ChartData>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartData {
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    pub quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuoteData {
    pub open: Vec<Option<f64>>,
    pub high: Vec<Option<f64>>,
    pub low: Vec<Option<f64>>,
    pub close: Vec<Option<f64>>,
    pub volume: Vec<Option<u64>>,
}

/// `{base}/v8/finance/chart/{ticker}?range={period}&interval=1d`
pub fn chart_url(base_url: &str, ticker: &str, period: Period) -> Result<Url, DataError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| DataError::SourceUnavailable(format!("invalid Yahoo base URL: {}", e)))?;

    url.path_segments_mut()
        .map_err(|_| DataError::SourceUnavailable(format!("{} cannot be a base URL", base_url)))?
        .pop_if_empty()
        .extend(["v8", "finance", "chart", ticker]);

    url.query_pairs_mut()
        .append_pair("range", &period.to_string())
        .append_pair("interval", "1d")
        .append_pair("includePrePost", "false");

    Ok(url)
}

/// Converts a chart payload into daily bars, oldest first.
///
/// Rows without a close (holidays, halted sessions) are skipped; missing
/// open/high/low fall back to the close. When Yahoo repeats a date (the
/// live session bar), the later row wins.
pub fn parse_chart(ticker: &str, response: ChartResponse) -> Result<Vec<Bar>, DataError> {
    let result = match (response.chart.result, response.chart.error) {
        (_, Some(err)) if err.code == "Not Found" => {
            return Err(DataError::SymbolNotFound {
                ticker: ticker.to_string(),
            });
        }
        (_, Some(err)) => {
            return Err(DataError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )));
        }
        (Some(result), None) => result,
        (None, None) => {
            return Err(DataError::ResponseFormatChanged(
                "empty result with no error".to_string(),
            ));
        }
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".to_string()))?;

    // A valid symbol with no trading days in range has no timestamps at all.
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars: Vec<Bar> = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        let date = timestamp_to_date(ts)?;
        let bar = Bar {
            date,
            open: quote.open.get(i).copied().flatten().unwrap_or(close),
            high: quote.high.get(i).copied().flatten().unwrap_or(close),
            low: quote.low.get(i).copied().flatten().unwrap_or(close),
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
        };

        match bars.last_mut() {
            Some(last) if last.date == date => *last = bar,
            _ => bars.push(bar),
        }
    }

    Ok(bars)
}

fn timestamp_to_date(ts: i64) -> Result<NaiveDate, DataError> {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {}", ts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ticker: &str, json: &str) -> Result<Vec<Bar>, DataError> {
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        parse_chart(ticker, response)
    }

    #[test]
    fn test_chart_url_layout() {
        let url = chart_url("https://query1.finance.yahoo.com", "AAPL", Period::Days(60)).unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/AAPL");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("range".to_string(), "60d".to_string())));
        assert!(query.contains(&("interval".to_string(), "1d".to_string())));
    }

    #[test]
    fn test_chart_url_tolerates_trailing_slash() {
        let url = chart_url("http://127.0.0.1:9000/", "MSFT", Period::Years(5)).unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/MSFT");
        assert!(url.as_str().contains("range=5y"));
    }

    #[test]
    fn test_parses_bars_and_skips_null_rows() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{
                "open":[187.15,null,182.15],
                "high":[188.44,null,183.09],
                "low":[183.89,null,180.88],
                "close":[185.64,null,181.91],
                "volume":[82488700,null,71983600]
            }]}
        }],"error":null}}"#;

        let bars = parse("AAPL", json).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[1].volume, 71983600);
    }

    #[test]
    fn test_repeated_date_keeps_latest_row() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704220000],
            "indicators":{"quote":[{
                "open":[1.0,1.0],"high":[2.0,2.0],"low":[0.5,0.5],
                "close":[1.5,1.7],"volume":[10,20]
            }]}
        }],"error":null}}"#;

        let bars = parse("AAPL", json).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 1.7);
    }

    #[test]
    fn test_not_found_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,"error":{
            "code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;

        assert!(matches!(
            parse("NOPE", json),
            Err(DataError::SymbolNotFound { ticker }) if ticker == "NOPE"
        ));
    }

    #[test]
    fn test_other_errors_are_format_changes() {
        let json = r#"{"chart":{"result":null,"error":{
            "code":"Bad Request","description":"Invalid input - interval=1d"}}}"#;

        assert!(matches!(
            parse("AAPL", json),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn test_missing_timestamps_yield_no_bars() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse("AAPL", json).unwrap().is_empty());
    }
}
