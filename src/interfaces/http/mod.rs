//! JSON API and landing page.
//!
//! Every handled outcome is answered with HTTP 200 and a `success` flag;
//! existing browser clients branch on that flag rather than on status codes.

pub mod dto;
pub mod handlers;

use crate::application::ForecastService;
use axum::Router;
use axum::routing::{get, post};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub fn router(service: Arc<ForecastService>, static_dir: &Path) -> Router {
    let index = static_dir.join("index.html");

    Router::new()
        .route("/train", post(handlers::train))
        .route("/predict", post(handlers::predict))
        .route("/history", get(handlers::history))
        .route_service("/", ServeFile::new(&index))
        .fallback_service(ServeDir::new(static_dir).not_found_service(ServeFile::new(&index)))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
