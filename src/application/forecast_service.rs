//! Orchestrates training, prediction and history lookups around one shared
//! model slot.
//!
//! The slot holds the served model and its scaler as a single immutable
//! snapshot. Training is serialized by `train_lock`; the snapshot swap and
//! the artifact write happen under the slot's write lock, so a prediction
//! sees either the previous run or the new one, never a mix.

use crate::application::ml::LoadedModel;
use crate::application::ml::lstm::{FitParams, FitReport};
use crate::application::ml::predictor::AutoregressivePredictor;
use crate::application::ml::trainer::{TrainRequest, train_on_series};
use crate::config::ModelEnvConfig;
use crate::domain::errors::{DataError, ForecastError};
use crate::domain::market::{Period, Series};
use crate::domain::ml::{Forecast, ModelManifest};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::persistence::artifact_store::ArtifactStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Defaults and limits applied by the service
#[derive(Debug, Clone)]
pub struct ForecastSettings {
    pub default_ticker: String,
    pub default_time_step: usize,
    pub max_time_step: usize,
    pub default_epochs: usize,
    pub train_period: Period,
    pub predict_ticker: String,
    pub predict_lookback: Period,
    pub inference_window: usize,
    pub default_forecast_days: usize,
    pub max_forecast_days: usize,
    pub fit: FitParams,
}

impl From<&ModelEnvConfig> for ForecastSettings {
    fn from(config: &ModelEnvConfig) -> Self {
        Self {
            default_ticker: config.default_ticker.clone(),
            default_time_step: config.default_time_step,
            max_time_step: config.max_time_step,
            default_epochs: config.default_epochs,
            train_period: config.train_period,
            predict_ticker: config.predict_ticker.clone(),
            predict_lookback: config.predict_lookback,
            inference_window: config.inference_window,
            default_forecast_days: config.default_forecast_days,
            max_forecast_days: config.max_forecast_days,
            fit: FitParams {
                epochs: config.default_epochs,
                batch_size: config.batch_size,
                learning_rate: config.learning_rate,
                validation_split: config.validation_split,
                seed: config.seed,
            },
        }
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self::from(&ModelEnvConfig::default())
    }
}

/// What a caller learns about a completed training run
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub manifest: ModelManifest,
    pub report: FitReport,
}

/// Point-in-time view of the served model
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub run_id: Option<Uuid>,
    pub ticker: Option<String>,
    pub time_step: Option<usize>,
    pub trained_at: Option<DateTime<Utc>>,
    pub final_loss: Option<f64>,
    pub final_val_loss: Option<f64>,
}

pub struct ForecastService {
    provider: Arc<dyn MarketDataProvider>,
    store: ArtifactStore,
    settings: ForecastSettings,
    metrics: Metrics,
    slot: RwLock<Option<Arc<LoadedModel>>>,
    train_lock: Mutex<()>,
}

impl ForecastService {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        store: ArtifactStore,
        settings: ForecastSettings,
        metrics: Metrics,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
            metrics,
            slot: RwLock::new(None),
            train_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fills unset fields from the configured defaults.
    pub fn train_request(
        &self,
        ticker: Option<String>,
        time_step: Option<usize>,
        epochs: Option<usize>,
    ) -> TrainRequest {
        let ticker = ticker
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.settings.default_ticker.clone());

        TrainRequest {
            ticker,
            time_step: time_step.unwrap_or(self.settings.default_time_step),
            epochs: epochs.unwrap_or(self.settings.default_epochs),
        }
    }

    /// Downloads history, fits a fresh model, persists it and makes it the
    /// served snapshot.
    #[instrument(skip(self), fields(ticker = %request.ticker))]
    pub async fn train(&self, request: TrainRequest) -> Result<TrainOutcome, ForecastError> {
        let started = Instant::now();
        let result = self.run_training(&request).await;

        match &result {
            Ok(outcome) => {
                let elapsed = started.elapsed().as_secs_f64();
                self.metrics.inc_train("ok");
                self.metrics
                    .training_duration_seconds
                    .with_label_values(&[request.ticker.as_str()])
                    .observe(elapsed);
                info!(
                    "ForecastService: trained {} in {:.1}s (run {}, loss {:?}, val loss {:?})",
                    request.ticker,
                    elapsed,
                    outcome.manifest.run_id,
                    outcome.report.final_loss(),
                    outcome.report.final_val_loss()
                );
            }
            Err(e) => {
                self.metrics.inc_train(e.kind());
                error!("ForecastService: training {} failed: {}", request.ticker, e);
            }
        }
        result
    }

    async fn run_training(&self, request: &TrainRequest) -> Result<TrainOutcome, ForecastError> {
        if request.time_step == 0 {
            return Err(ForecastError::InvalidRequest(
                "time_step must be positive".to_string(),
            ));
        }
        if request.time_step > self.settings.max_time_step {
            return Err(ForecastError::InvalidRequest(format!(
                "time_step must be at most {}, got {}",
                self.settings.max_time_step, request.time_step
            )));
        }
        if request.epochs == 0 {
            return Err(ForecastError::InvalidRequest(
                "epochs must be positive".to_string(),
            ));
        }

        let _training = self.train_lock.lock().await;

        let series = self
            .fetch(&request.ticker, self.settings.train_period, "train")
            .await?;

        let owned_request = request.clone();
        let params = self.settings.fit.clone();
        let trained =
            tokio::task::spawn_blocking(move || train_on_series(&series, &owned_request, &params))
                .await
                .map_err(ForecastError::training)??;

        let mut slot = self.slot.write().await;

        let store = self.store.clone();
        let (trained, manifest) = tokio::task::spawn_blocking(move || {
            let manifest = store.save(&trained.scaler, &trained.manifest, |path| {
                trained.model.save(path)
            })?;
            Ok::<_, ForecastError>((trained, manifest))
        })
        .await
        .map_err(ForecastError::persistence)??;

        let report = trained.report.clone();
        *slot = Some(Arc::new(LoadedModel {
            model: trained.model,
            scaler: trained.scaler,
            manifest: manifest.clone(),
        }));
        drop(slot);

        self.metrics.model_loaded.set(1.0);
        self.metrics
            .set_model_losses(manifest.final_loss, manifest.final_val_loss);

        Ok(TrainOutcome { manifest, report })
    }

    /// Rolls the served model forward `days` calendar days past the most
    /// recent close of the inference ticker.
    #[instrument(skip(self))]
    pub async fn predict(&self, days: usize) -> Result<Forecast, ForecastError> {
        let result = self.run_prediction(days).await;
        match &result {
            Ok(_) => self.metrics.inc_predict("ok"),
            Err(e) => {
                self.metrics.inc_predict(e.kind());
                warn!("ForecastService: prediction failed: {}", e);
            }
        }
        result
    }

    async fn run_prediction(&self, days: usize) -> Result<Forecast, ForecastError> {
        if days > self.settings.max_forecast_days {
            return Err(ForecastError::InvalidRequest(format!(
                "days must be at most {}, got {}",
                self.settings.max_forecast_days, days
            )));
        }

        let snapshot = self.current_model().await?;
        let recent = self
            .fetch(
                &self.settings.predict_ticker,
                self.settings.predict_lookback,
                "predict",
            )
            .await?;

        if snapshot.manifest.time_step != self.settings.inference_window {
            warn!(
                "ForecastService: model trained with time_step {} but inference window is {}",
                snapshot.manifest.time_step, self.settings.inference_window
            );
        }

        let window = self.settings.inference_window;
        tokio::task::spawn_blocking(move || {
            AutoregressivePredictor::new(&snapshot.model, &snapshot.scaler, window)
                .forecast(&recent, days)
        })
        .await
        .map_err(ForecastError::inference)?
    }

    /// Raw daily bars for `ticker` over `period`.
    #[instrument(skip(self))]
    pub async fn history(&self, ticker: &str, period: Period) -> Result<Series, ForecastError> {
        let ticker = ticker.trim().to_uppercase();
        let result = if ticker.is_empty() {
            Err(ForecastError::InvalidRequest(
                "ticker must not be empty".to_string(),
            ))
        } else {
            self.fetch(&ticker, period, "history")
                .await
                .map_err(ForecastError::from)
        };

        match &result {
            Ok(_) => self.metrics.inc_history("ok"),
            Err(e) => self.metrics.inc_history(e.kind()),
        }
        result
    }

    /// The served snapshot, loading persisted artifacts on first use.
    pub async fn current_model(&self) -> Result<Arc<LoadedModel>, ForecastError> {
        if let Some(model) = self.slot.read().await.as_ref() {
            return Ok(Arc::clone(model));
        }

        let mut slot = self.slot.write().await;
        // Another request may have loaded it while we waited.
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        let store = self.store.clone();
        let loaded = tokio::task::spawn_blocking(move || LoadedModel::from_artifacts(store.load()?))
            .await
            .map_err(ForecastError::persistence)??;
        let loaded = Arc::new(loaded);

        info!(
            "ForecastService: serving run {} ({}) from {:?}",
            loaded.manifest.run_id,
            loaded.manifest.ticker,
            self.store.dir()
        );
        self.metrics.model_loaded.set(1.0);
        self.metrics
            .set_model_losses(loaded.manifest.final_loss, loaded.manifest.final_val_loss);

        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    pub async fn status(&self) -> ModelStatus {
        match self.slot.read().await.as_ref() {
            Some(model) => ModelStatus {
                loaded: true,
                run_id: Some(model.manifest.run_id),
                ticker: Some(model.manifest.ticker.clone()),
                time_step: Some(model.manifest.time_step),
                trained_at: Some(model.manifest.trained_at),
                final_loss: model.manifest.final_loss,
                final_val_loss: model.manifest.final_val_loss,
            },
            None => ModelStatus::default(),
        }
    }

    async fn fetch(&self, ticker: &str, period: Period, operation: &str) -> Result<Series, DataError> {
        let started = Instant::now();
        let result = self.provider.fetch_series(ticker, period).await;
        self.metrics.observe_provider_latency(
            self.provider.name(),
            operation,
            started.elapsed().as_secs_f64(),
        );

        let series = result?;
        if series.is_empty() {
            return Err(DataError::Empty {
                ticker: ticker.to_string(),
                period: period.to_string(),
            });
        }
        Ok(series)
    }
}
