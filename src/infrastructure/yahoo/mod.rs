pub mod common;
pub mod market_data;

pub use market_data::YahooMarketDataProvider;
