//! Drives the Yahoo chart client against a local stand-in server.

use axum::Router;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use stockcast::domain::errors::DataError;
use stockcast::domain::market::Period;
use stockcast::domain::ports::MarketDataProvider;
use stockcast::infrastructure::core::HttpSettings;
use stockcast::infrastructure::yahoo::YahooMarketDataProvider;
use tokio::net::TcpListener;

const AAPL_CHART: &str = r#"{"chart":{"result":[{
    "meta":{"symbol":"AAPL","currency":"USD"},
    "timestamp":[1704205800,1704292200,1704378600],
    "indicators":{"quote":[{
        "open":[187.15,184.22,182.15],
        "high":[188.44,185.88,183.09],
        "low":[183.89,183.43,180.88],
        "close":[185.64,184.25,181.91],
        "volume":[82488700,58414500,71983600]
    }]}
}],"error":null}}"#;

const NOT_FOUND: &str = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;

async fn chart(
    Path(ticker): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("interval").map(String::as_str) != Some("1d") {
        return (StatusCode::BAD_REQUEST, "daily bars only").into_response();
    }
    match ticker.as_str() {
        "AAPL" => AAPL_CHART.into_response(),
        "BROKEN" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream failure").into_response(),
        "GARBLED" => "<html>maintenance</html>".into_response(),
        _ => (StatusCode::NOT_FOUND, NOT_FOUND).into_response(),
    }
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new().route("/v8/finance/chart/{ticker}", get(chart));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

fn provider(addr: SocketAddr) -> YahooMarketDataProvider {
    YahooMarketDataProvider::new(
        format!("http://{}", addr),
        HttpSettings {
            timeout: Duration::from_secs(5),
            max_retries: 0,
        },
    )
}

#[tokio::test]
async fn test_fetches_daily_bars() {
    let addr = spawn_server().await;
    let series = provider(addr)
        .fetch_series("AAPL", Period::Max)
        .await
        .unwrap();

    assert_eq!(series.ticker(), "AAPL");
    assert_eq!(series.len(), 3);
    assert_eq!(
        series.bars()[0].date,
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    );
    assert_eq!(series.closes(), vec![185.64, 184.25, 181.91]);
}

#[tokio::test]
async fn test_unknown_symbol() {
    let addr = spawn_server().await;
    let result = provider(addr).fetch_series("ZZZZ", Period::Days(60)).await;

    assert!(matches!(result, Err(DataError::SymbolNotFound { .. })));
}

#[tokio::test]
async fn test_server_error_is_source_unavailable() {
    let addr = spawn_server().await;
    let result = provider(addr).fetch_series("BROKEN", Period::Days(60)).await;

    assert!(matches!(result, Err(DataError::SourceUnavailable(_))));
}

#[tokio::test]
async fn test_unparsable_payload_is_format_change() {
    let addr = spawn_server().await;
    let result = provider(addr).fetch_series("GARBLED", Period::Days(60)).await;

    assert!(matches!(result, Err(DataError::ResponseFormatChanged(_))));
}

#[tokio::test]
async fn test_circuit_opens_after_repeated_failures() {
    let addr = spawn_server().await;
    let provider = provider(addr);

    for _ in 0..5 {
        let _ = provider.fetch_series("BROKEN", Period::Days(60)).await;
    }

    // The breaker now short-circuits even healthy symbols.
    let result = provider.fetch_series("AAPL", Period::Max).await;
    match result {
        Err(DataError::SourceUnavailable(msg)) => assert!(msg.contains("YahooChart"), "{}", msg),
        other => panic!("expected open circuit, got {:?}", other.map(|s| s.len())),
    }
}

#[tokio::test]
async fn test_unreachable_host() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = provider(addr).fetch_series("AAPL", Period::Days(60)).await;
    assert!(matches!(result, Err(DataError::NetworkUnreachable(_))));
}
