//! Two-layer LSTM next-close regressor built on candle.
//!
//! Layout: LSTM(50, full sequence) -> Dropout(0.2) -> LSTM(50, last state)
//! -> Dropout(0.2) -> Dense(25) -> Dense(1). Inputs are `(batch, time_step, 1)`
//! windows of normalized closes; the output is one normalized close per row.

use super::predictor::SequenceRegressor;
use crate::domain::errors::ForecastError;
use crate::domain::ml::{Architecture, TrainingPair, TrainingSet};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{
    AdamW, Dropout, LSTM, LSTMConfig, Linear, Optimizer, ParamsAdamW, RNN, VarBuilder, VarMap,
    linear, lstm,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Optimizer and schedule settings for one fit
#[derive(Debug, Clone, PartialEq)]
pub struct FitParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub seed: u64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 64,
            learning_rate: 0.001,
            validation_split: 0.2,
            seed: 42,
        }
    }
}

/// Per-epoch losses of a completed fit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FitReport {
    pub epochs: usize,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub loss_history: Vec<f64>,
    pub val_loss_history: Vec<f64>,
}

impl FitReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }

    pub fn final_val_loss(&self) -> Option<f64> {
        self.val_loss_history.last().copied()
    }
}

struct ForecastNet {
    lstm1: LSTM,
    lstm2: LSTM,
    dropout: Dropout,
    dense: Linear,
    output: Linear,
}

impl ForecastNet {
    fn new(arch: &Architecture, vb: VarBuilder) -> candle_core::Result<Self> {
        let [units1, units2] = arch.lstm_units;
        let lstm1 = lstm(arch.input_features, units1, LSTMConfig::default(), vb.pp("lstm1"))?;
        let lstm2 = lstm(units1, units2, LSTMConfig::default(), vb.pp("lstm2"))?;
        let dense = linear(units2, arch.dense_units, vb.pp("dense"))?;
        let output = linear(arch.dense_units, arch.output_units, vb.pp("output"))?;

        Ok(Self {
            lstm1,
            lstm2,
            dropout: Dropout::new(arch.dropout),
            dense,
            output,
        })
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let states = self.lstm1.seq(xs)?;
        let hidden = self.lstm1.states_to_tensor(&states)?;
        let hidden = self.dropout.forward(&hidden, train)?;

        let states = self.lstm2.seq(&hidden)?;
        let last = states
            .last()
            .ok_or_else(|| candle_core::Error::Msg("input sequence is empty".to_string()))?;
        let last = self.dropout.forward(last.h(), train)?;

        let xs = self.dense.forward(&last)?;
        self.output.forward(&xs)
    }
}

enum Weights {
    /// Variables owned by a fit, still attached to the optimizer graph
    Trainable(VarMap),
    /// Tensors restored from a safetensors artifact
    Frozen(HashMap<String, Tensor>),
}

/// Fitted forecast network ready for inference and persistence.
pub struct LstmForecaster {
    net: ForecastNet,
    weights: Weights,
    device: Device,
}

impl LstmForecaster {
    /// Builds a fresh network and fits it on `set`.
    ///
    /// The last `validation_split` share of pairs is held out, Keras style.
    /// Training batches are reshuffled every epoch with a seeded RNG.
    pub fn fit(set: &TrainingSet, params: &FitParams) -> Result<(Self, FitReport), ForecastError> {
        if params.batch_size == 0 {
            return Err(ForecastError::InvalidRequest(
                "batch size must be positive".to_string(),
            ));
        }

        let (train, validation) = set.split_validation(params.validation_split);
        if train.is_empty() {
            return Err(ForecastError::training(format!(
                "no training pairs left after a {:.0}% validation split of {} pairs",
                params.validation_split * 100.0,
                set.len()
            )));
        }

        Self::fit_pairs(train, validation, set.time_step(), params).map_err(ForecastError::training)
    }

    fn fit_pairs(
        train: &[TrainingPair],
        validation: &[TrainingPair],
        time_step: usize,
        params: &FitParams,
    ) -> candle_core::Result<(Self, FitReport)> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = ForecastNet::new(&Architecture::default(), vb)?;

        let (x_train, y_train) = pairs_to_tensors(train, time_step, &device)?;
        let held_out = if validation.is_empty() {
            None
        } else {
            Some(pairs_to_tensors(validation, time_step, &device)?)
        };

        let adam = ParamsAdamW {
            lr: params.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(varmap.all_vars(), adam)?;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut order: Vec<u32> = (0..train.len() as u32).collect();

        let mut report = FitReport {
            epochs: params.epochs,
            train_samples: train.len(),
            validation_samples: validation.len(),
            ..Default::default()
        };

        for epoch in 1..=params.epochs {
            order.shuffle(&mut rng);

            let mut weighted_loss = 0.0;
            for batch in order.chunks(params.batch_size) {
                let index = Tensor::new(batch, &device)?;
                let xs = x_train.index_select(&index, 0)?;
                let ys = y_train.index_select(&index, 0)?;

                let predictions = net.forward_t(&xs, true)?;
                let loss = candle_nn::loss::mse(&predictions, &ys)?;
                optimizer.backward_step(&loss)?;

                weighted_loss += f64::from(loss.to_scalar::<f32>()?) * batch.len() as f64;
            }
            let loss = weighted_loss / train.len() as f64;
            report.loss_history.push(loss);

            let val_loss = match &held_out {
                Some((xs, ys)) => {
                    let predictions = net.forward_t(xs, false)?;
                    let val = candle_nn::loss::mse(&predictions, ys)?.to_scalar::<f32>()?;
                    report.val_loss_history.push(f64::from(val));
                    Some(f64::from(val))
                }
                None => None,
            };

            debug!(
                epoch,
                epochs = params.epochs,
                loss,
                val_loss = ?val_loss,
                "LstmForecaster: epoch complete"
            );
        }

        info!(
            "LstmForecaster: fitted on {} pairs ({} held out), final loss {:?}, val loss {:?}",
            report.train_samples,
            report.validation_samples,
            report.final_loss(),
            report.final_val_loss()
        );

        Ok((
            Self {
                net,
                weights: Weights::Trainable(varmap),
                device,
            },
            report,
        ))
    }

    /// Restores a network from safetensors bytes written by [`LstmForecaster::save`].
    ///
    /// Missing or mis-shaped tensors are reported as an artifact mismatch.
    pub fn from_safetensors(bytes: &[u8]) -> Result<Self, ForecastError> {
        let device = Device::Cpu;
        let tensors =
            candle_core::safetensors::load_buffer(bytes, &device).map_err(ForecastError::mismatch)?;
        let vb = VarBuilder::from_tensors(tensors.clone(), DType::F32, &device);
        let net = ForecastNet::new(&Architecture::default(), vb).map_err(ForecastError::mismatch)?;

        Ok(Self {
            net,
            weights: Weights::Frozen(tensors),
            device,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ForecastError> {
        match &self.weights {
            Weights::Trainable(varmap) => varmap.save(path),
            Weights::Frozen(tensors) => candle_core::safetensors::save(tensors, path),
        }
        .map_err(ForecastError::persistence)
    }

    fn forward_window(&self, window: &[f64]) -> candle_core::Result<f32> {
        let input: Vec<f32> = window.iter().map(|v| *v as f32).collect();
        let xs = Tensor::from_vec(input, (1, window.len(), 1), &self.device)?;
        let ys = self.net.forward_t(&xs, false)?;
        ys.flatten_all()?
            .to_vec1::<f32>()?
            .first()
            .copied()
            .ok_or_else(|| candle_core::Error::Msg("model produced no output".to_string()))
    }
}

impl SequenceRegressor for LstmForecaster {
    fn predict_next(&self, window: &[f64]) -> Result<f64, ForecastError> {
        if window.is_empty() {
            return Err(ForecastError::InferenceFailed(
                "input window is empty".to_string(),
            ));
        }

        self.forward_window(window)
            .map(f64::from)
            .map_err(ForecastError::inference)
    }

    fn name(&self) -> &str {
        "LSTM(50,50)-Dense(25,1)"
    }
}

fn pairs_to_tensors(
    pairs: &[TrainingPair],
    time_step: usize,
    device: &Device,
) -> candle_core::Result<(Tensor, Tensor)> {
    let windows: Vec<f32> = pairs
        .iter()
        .flat_map(|pair| pair.window.iter().map(|v| *v as f32))
        .collect();
    let targets: Vec<f32> = pairs.iter().map(|pair| pair.target as f32).collect();

    let xs = Tensor::from_vec(windows, (pairs.len(), time_step, 1), device)?;
    let ys = Tensor::from_vec(targets, (pairs.len(), 1), device)?;
    Ok((xs, ys))
}
