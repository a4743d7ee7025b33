use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stockcast::application::{ForecastService, ForecastSettings};
use stockcast::domain::market::Period;
use stockcast::infrastructure::ArtifactStore;
use stockcast::infrastructure::mock::MockMarketDataProvider;
use stockcast::infrastructure::observability::Metrics;
use stockcast::interfaces::http::handlers::MODEL_NOT_FOUND;
use stockcast::interfaces::http::router;
use tower::ServiceExt;

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

struct TestApp {
    router: Router,
    root: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}

fn app() -> TestApp {
    let root = std::env::temp_dir().join(format!(
        "stockcast_http_{}_{}",
        std::process::id(),
        TEST_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::remove_dir_all(&root).ok();
    let static_dir = root.join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), "<html>stockcast</html>").unwrap();

    let mut settings = ForecastSettings {
        default_time_step: 10,
        default_epochs: 1,
        train_period: Period::Years(1),
        inference_window: 10,
        ..ForecastSettings::default()
    };
    settings.fit.batch_size = 32;

    let anchor = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
    let service = ForecastService::new(
        Arc::new(MockMarketDataProvider::anchored(11, anchor)),
        ArtifactStore::new(root.join("models")),
        settings,
        Metrics::new().unwrap(),
    );

    TestApp {
        router: router(Arc::new(service), &static_dir),
        root,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_predict_before_training_reports_missing_model() {
    let app = app();
    let (status, body) = send(&app.router, post_json("/predict", r#"{"days": 5}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], MODEL_NOT_FOUND);
    assert!(body.get("predictions").is_none());
}

#[tokio::test]
async fn test_train_then_predict() {
    let app = app();

    // Numeric fields sent as strings are accepted.
    let (status, body) = send(
        &app.router,
        post_json("/train", r#"{"ticker": "msft", "time_step": "10", "epochs": "1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true, "{}", body);

    let (_, body) = send(&app.router, post_json("/predict", r#"{"days": 4}"#)).await;
    assert_eq!(body["success"], true, "{}", body);
    let dates = body["predictions"]["dates"].as_array().unwrap();
    let prices = body["predictions"]["prices"].as_array().unwrap();
    assert_eq!(dates.len(), 4);
    assert_eq!(prices.len(), 4);
    for date in dates {
        let date = date.as_str().unwrap();
        assert!(NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok(), "{}", date);
    }
}

#[tokio::test]
async fn test_train_with_empty_body_uses_defaults() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/train")
        .body(Body::empty())
        .unwrap();

    let (_, body) = send(&app.router, request).await;
    assert_eq!(body["success"], true, "{}", body);
}

#[tokio::test]
async fn test_malformed_body_is_reported_in_band() {
    let app = app();

    let (status, body) = send(&app.router, post_json("/train", "{not json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body")
    );

    let (_, body) = send(&app.router, post_json("/predict", r#"{"days": "soon"}"#)).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_history_returns_daily_rows() {
    let app = app();
    let (status, body) = send(&app.router, get("/history?ticker=aapl&period=1mo")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true, "{}", body);
    let rows = body["data"].as_array().unwrap();
    assert!(!rows.is_empty());
    let first = &rows[0];
    for field in ["date", "open", "high", "low", "close", "volume"] {
        assert!(first.get(field).is_some(), "missing {}", field);
    }
    let dates: Vec<&str> = rows.iter().map(|r| r["date"].as_str().unwrap()).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);
}

#[tokio::test]
async fn test_history_rejects_unknown_period() {
    let app = app();
    let (_, body) = send(&app.router, get("/history?ticker=AAPL&period=forever")).await;

    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_index_page_is_served() {
    let app = app();
    let response = app.router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"<html>stockcast</html>");
}
