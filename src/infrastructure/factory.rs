use crate::config::{DataProviderKind, ProviderEnvConfig};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::HttpSettings;
use crate::infrastructure::csv_data::CsvMarketDataProvider;
use crate::infrastructure::mock::MockMarketDataProvider;
use crate::infrastructure::yahoo::YahooMarketDataProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_provider(config: &ProviderEnvConfig) -> Arc<dyn MarketDataProvider> {
        let provider: Arc<dyn MarketDataProvider> = match config.kind {
            DataProviderKind::Yahoo => Arc::new(YahooMarketDataProvider::new(
                config.yahoo_base_url.clone(),
                HttpSettings {
                    timeout: Duration::from_secs(config.http_timeout_secs),
                    max_retries: config.http_max_retries,
                },
            )),
            DataProviderKind::Csv => {
                Arc::new(CsvMarketDataProvider::new(config.csv_data_dir.clone()))
            }
            DataProviderKind::Mock => Arc::new(MockMarketDataProvider::new(config.mock_seed)),
        };

        info!("ProviderFactory: using {} market data", provider.name());
        provider
    }
}
