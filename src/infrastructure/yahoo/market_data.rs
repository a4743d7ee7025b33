use super::common::{ChartResponse, chart_url, parse_chart};
use crate::domain::errors::DataError;
use crate::domain::market::{Period, Series};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, HttpSettings};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Daily history from the Yahoo Finance chart API.
pub struct YahooMarketDataProvider {
    client: ClientWithMiddleware,
    base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl YahooMarketDataProvider {
    pub fn new(base_url: impl Into<String>, settings: HttpSettings) -> Self {
        Self {
            client: HttpClientFactory::create_client(settings),
            base_url: base_url.into(),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                "YahooChart",
                5,
                1,
                Duration::from_secs(30),
            )),
        }
    }

    /// Transport only: connection problems and server errors count against
    /// the circuit breaker, a 404 body is handed back for parsing.
    async fn download(&self, url: Url) -> Result<String, DataError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = response.status();
        if !(status.is_success() || status == StatusCode::NOT_FOUND) {
            return Err(DataError::SourceUnavailable(format!(
                "Yahoo returned HTTP {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))
    }
}

#[async_trait]
impl MarketDataProvider for YahooMarketDataProvider {
    async fn fetch_series(&self, ticker: &str, period: Period) -> Result<Series, DataError> {
        let url = chart_url(&self.base_url, ticker, period)?;
        debug!("YahooMarketDataProvider: GET {}", url);

        let body = self
            .circuit_breaker
            .call(self.download(url))
            .await
            .map_err(|e| match e {
                CircuitBreakerError::Open(msg) => DataError::SourceUnavailable(msg),
                CircuitBreakerError::Inner(e) => e,
            })?;

        let response: ChartResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("YahooMarketDataProvider: unparsable chart for {}: {}", ticker, e);
            DataError::ResponseFormatChanged(format!("chart for {}: {}", ticker, e))
        })?;

        let bars = parse_chart(ticker, response)?;
        if bars.is_empty() {
            return Err(DataError::Empty {
                ticker: ticker.to_string(),
                period: period.to_string(),
            });
        }

        Series::new(ticker, bars)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
