use super::dto::{
    HistoryQuery, HistoryResponse, PredictBody, PredictResponse, TrainBody, TrainResponse,
};
use crate::application::ForecastService;
use crate::domain::errors::ForecastError;
use crate::domain::market::Period;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

pub const TRAINED: &str = "Model trained successfully";
pub const TRAIN_DATA_UNAVAILABLE: &str = "Failed to download stock data";
pub const MODEL_NOT_FOUND: &str = "Model not found. Please train the model first.";
pub const PREDICT_DATA_UNAVAILABLE: &str = "Failed to download recent stock data";
pub const HISTORY_UNAVAILABLE: &str = "Failed to fetch historical data";

/// Empty or `null` bodies mean "all defaults".
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice::<Option<T>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| format!("Invalid request body: {}", e))
}

fn train_message(error: &ForecastError) -> String {
    match error {
        ForecastError::DataUnavailable(_) => TRAIN_DATA_UNAVAILABLE.to_string(),
        ForecastError::InsufficientData {
            required,
            available,
        } => format!(
            "Not enough data to train: need at least {} closes, got {}",
            required, available
        ),
        ForecastError::InvalidRequest(reason) => format!("Invalid request: {}", reason),
        other => format!("Training failed: {}", other),
    }
}

fn predict_message(error: &ForecastError) -> String {
    match error {
        ForecastError::ModelMissing { .. } => MODEL_NOT_FOUND.to_string(),
        ForecastError::DataUnavailable(_) => PREDICT_DATA_UNAVAILABLE.to_string(),
        ForecastError::InvalidRequest(reason) => format!("Invalid request: {}", reason),
        other => format!("Error making predictions: {}", other),
    }
}

pub async fn train(
    State(service): State<Arc<ForecastService>>,
    body: Bytes,
) -> Json<TrainResponse> {
    let body: TrainBody = match parse_body(&body) {
        Ok(body) => body,
        Err(message) => {
            return Json(TrainResponse {
                success: false,
                message,
            });
        }
    };

    let request = service.train_request(body.ticker, body.time_step, body.epochs);
    let response = match service.train(request).await {
        Ok(_) => TrainResponse {
            success: true,
            message: TRAINED.to_string(),
        },
        Err(e) => TrainResponse {
            success: false,
            message: train_message(&e),
        },
    };
    Json(response)
}

pub async fn predict(
    State(service): State<Arc<ForecastService>>,
    body: Bytes,
) -> Json<PredictResponse> {
    let body: PredictBody = match parse_body(&body) {
        Ok(body) => body,
        Err(message) => return Json(PredictResponse::failed(message)),
    };

    let days = body.days.unwrap_or(service.settings().default_forecast_days);
    match service.predict(days).await {
        Ok(forecast) => Json(PredictResponse::ok(forecast)),
        Err(e) => Json(PredictResponse::failed(predict_message(&e))),
    }
}

pub async fn history(
    State(service): State<Arc<ForecastService>>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let ticker = query
        .ticker
        .unwrap_or_else(|| service.settings().default_ticker.clone());
    let period = match Period::from_str(query.period.as_deref().unwrap_or("1y")) {
        Ok(period) => period,
        Err(e) => return Json(HistoryResponse::failed(e.to_string())),
    };

    match service.history(&ticker, period).await {
        Ok(series) => Json(HistoryResponse::ok(&series)),
        Err(ForecastError::InvalidRequest(reason)) => {
            Json(HistoryResponse::failed(format!("Invalid request: {}", reason)))
        }
        Err(e) => {
            warn!("history {} {}: {}", ticker, period, e);
            Json(HistoryResponse::failed(HISTORY_UNAVAILABLE))
        }
    }
}
