//! Training loop for the score model
//!
//! Full-batch SGD on mean squared error over z-scored inputs and targets.

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{GradientsParams, Optimizer, Sgd, SgdConfig};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureTable, MODEL_COLUMNS};
use crate::model::{ScoreModel, ScoreModelConfig};
use crate::training::metrics::{RegressionMetrics, TrainingHistory};
use crate::{GridironError, Result, TrainingConfig};

const N_FEATURES: usize = MODEL_COLUMNS.len();

/// Score normalization parameters (computed from training targets)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreNormalization {
    pub mean: f32,
    pub std: f32,
}

impl Default for ScoreNormalization {
    fn default() -> Self {
        // Typical NFL points per team per game
        ScoreNormalization {
            mean: 22.0,
            std: 10.0,
        }
    }
}

impl ScoreNormalization {
    /// Compute normalization params from home/away score pairs
    pub fn from_targets(targets: &[[f32; 2]]) -> Self {
        if targets.is_empty() {
            return Self::default();
        }

        let scores: Vec<f32> = targets.iter().flat_map(|t| t.iter().copied()).collect();
        let n = scores.len() as f32;
        let mean = scores.iter().sum::<f32>() / n;
        let variance = scores.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;
        let std = variance.sqrt().max(1.0);

        ScoreNormalization { mean, std }
    }

    /// Normalize a score
    pub fn normalize(&self, score: f32) -> f32 {
        (score - self.mean) / self.std
    }

    /// Denormalize a score
    pub fn denormalize(&self, normalized: f32) -> f32 {
        normalized * self.std + self.mean
    }
}

/// Per-column z-score normalization of model inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNormalization {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureNormalization {
    /// Compute from training inputs
    pub fn from_inputs(inputs: &[[f32; N_FEATURES]]) -> Self {
        let mut sum = vec![0.0f32; N_FEATURES];
        let mut sum_sq = vec![0.0f32; N_FEATURES];

        for row in inputs {
            for j in 0..N_FEATURES {
                sum[j] += row[j];
                sum_sq[j] += row[j] * row[j];
            }
        }

        let n = inputs.len().max(1) as f32;
        let mean: Vec<f32> = sum.iter().map(|s| s / n).collect();
        let std: Vec<f32> = sum_sq
            .iter()
            .zip(mean.iter())
            .map(|(sq, m)| ((sq / n - m * m).max(0.0).sqrt()).max(0.001))
            .collect();

        FeatureNormalization { mean, std }
    }

    /// Normalize rows into a flat row-major buffer
    pub fn normalize_rows(&self, inputs: &[[f32; N_FEATURES]]) -> Vec<f32> {
        inputs
            .iter()
            .flat_map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| (v - self.mean[j]) / self.std[j])
            })
            .collect()
    }
}

/// Model inputs and score targets for completed games
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub inputs: Vec<[f32; N_FEATURES]>,
    pub targets: Vec<[f32; 2]>,
}

impl TrainingSet {
    /// Rows with both scores; unplayed games are skipped
    pub fn from_table(table: &FeatureTable) -> Self {
        let mut set = TrainingSet::default();
        for (r, inputs) in table.records().iter().zip(table.feature_matrix()) {
            if let (Some(home), Some(away)) = (r.home_points, r.away_points) {
                set.inputs.push(inputs);
                set.targets.push([home as f32, away as f32]);
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Seeded shuffle split into (train, validation)
    pub fn split(&self, validation_fraction: f64, seed: u64) -> (TrainingSet, TrainingSet) {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_val = ((self.len() as f64) * validation_fraction.clamp(0.0, 1.0)).round() as usize;
        let n_val = n_val.min(self.len().saturating_sub(1));
        let (val_idx, train_idx) = indices.split_at(n_val);

        let pick = |idx: &[usize]| TrainingSet {
            inputs: idx.iter().map(|&i| self.inputs[i]).collect(),
            targets: idx.iter().map(|&i| self.targets[i]).collect(),
        };
        (pick(train_idx), pick(val_idx))
    }
}

/// Output of a training run
pub struct TrainedModel<B: AutodiffBackend> {
    pub model: ScoreModel<B>,
    pub history: TrainingHistory,
    pub feature_norm: FeatureNormalization,
    pub score_norm: ScoreNormalization,
    pub val_metrics: RegressionMetrics,
}

/// Trainer for the score model
pub struct ScoreTrainer<B: AutodiffBackend> {
    model: ScoreModel<B>,
    optimizer: OptimizerAdaptor<Sgd<B::InnerBackend>, ScoreModel<B>, B>,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> ScoreTrainer<B> {
    /// Create a new trainer
    pub fn new(device: B::Device, config: &ScoreModelConfig, learning_rate: f64) -> Self {
        let model = ScoreModel::new(&device, config);
        let optimizer = SgdConfig::new().init();

        ScoreTrainer {
            model,
            optimizer,
            learning_rate,
            device,
        }
    }

    /// Train on `train`, selecting the epoch with the lowest validation loss
    pub fn train(
        mut self,
        train: &TrainingSet,
        val: &TrainingSet,
        config: &TrainingConfig,
    ) -> Result<TrainedModel<B>> {
        if train.is_empty() {
            return Err(GridironError::NoData("no completed games to train on".to_string()));
        }
        // Without a validation split, select on the training rows themselves
        let val = if val.is_empty() { train } else { val };

        let feature_norm = FeatureNormalization::from_inputs(&train.inputs);
        let score_norm = ScoreNormalization::from_targets(&train.targets);
        log::info!(
            "Score normalization: mean={:.2}, std={:.2}",
            score_norm.mean,
            score_norm.std
        );
        log::debug!(
            "Feature normalization: mean={:?}, std={:?}",
            feature_norm.mean,
            feature_norm.std
        );

        let x_train = self.inputs_tensor::<B>(train, &feature_norm);
        let y_train = self.targets_tensor::<B>(train, score_norm);
        let x_val = self.inputs_tensor::<B::InnerBackend>(val, &feature_norm);
        let y_val = self.targets_tensor::<B::InnerBackend>(val, score_norm);

        let mut history = TrainingHistory::new();
        let mut best_model = self.model.clone();
        let mut best_metrics = RegressionMetrics::default();

        log::info!(
            "Starting training for {} epochs ({} train / {} val games)",
            config.epochs,
            train.len(),
            val.len()
        );

        for epoch in 0..config.epochs {
            let preds = self.model.forward(x_train.clone());
            let loss = (preds - y_train.clone()).powf_scalar(2.0).mean();
            let loss_val: f32 = loss.clone().into_scalar().elem();

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self.optimizer.step(self.learning_rate, self.model.clone(), grads);

            let train_metrics = RegressionMetrics::new(loss_val as f64);
            let val_metrics = evaluate(
                &self.model.valid(),
                x_val.clone(),
                y_val.clone(),
                val,
                score_norm,
            )?;

            if history.record_epoch(epoch, &train_metrics, &val_metrics) {
                best_model = self.model.clone();
                best_metrics = val_metrics.clone();
            }

            if epoch % 25 == 0 || epoch + 1 == config.epochs {
                log::info!(
                    "Epoch {}/{}: Train loss: {:.4} | Val: {}",
                    epoch + 1,
                    config.epochs,
                    loss_val,
                    val_metrics
                );
            }

            if history.should_early_stop(config.early_stopping_patience) {
                log::info!(
                    "Early stopping at epoch {} (best was epoch {})",
                    epoch + 1,
                    history.best_epoch + 1
                );
                break;
            }
        }

        Ok(TrainedModel {
            model: best_model,
            history,
            feature_norm,
            score_norm,
            val_metrics: best_metrics,
        })
    }

    fn inputs_tensor<T: Backend<Device = B::Device>>(
        &self,
        set: &TrainingSet,
        norm: &FeatureNormalization,
    ) -> Tensor<T, 2> {
        let data = norm.normalize_rows(&set.inputs);
        Tensor::<T, 1>::from_floats(data.as_slice(), &self.device).reshape([set.len(), N_FEATURES])
    }

    fn targets_tensor<T: Backend<Device = B::Device>>(
        &self,
        set: &TrainingSet,
        norm: ScoreNormalization,
    ) -> Tensor<T, 2> {
        let data: Vec<f32> = set
            .targets
            .iter()
            .flat_map(|t| [norm.normalize(t[0]), norm.normalize(t[1])])
            .collect();
        Tensor::<T, 1>::from_floats(data.as_slice(), &self.device).reshape([set.len(), 2])
    }
}

/// Loss and point errors of `model` on a prepared validation set
fn evaluate<T: Backend>(
    model: &ScoreModel<T>,
    x: Tensor<T, 2>,
    y: Tensor<T, 2>,
    set: &TrainingSet,
    score_norm: ScoreNormalization,
) -> Result<RegressionMetrics> {
    let preds = model.forward(x);
    let loss: f32 = (preds.clone() - y).powf_scalar(2.0).mean().into_scalar().elem();
    let values: Vec<f32> = preds
        .into_data()
        .to_vec()
        .map_err(|e| GridironError::Model(format!("{:?}", e)))?;

    let mut metrics = RegressionMetrics::new(loss as f64);
    for (pred, target) in values.chunks_exact(2).zip(set.targets.iter()) {
        metrics.update(
            (
                score_norm.denormalize(pred[0]),
                score_norm.denormalize(pred[1]),
            ),
            (target[0], target[1]),
        );
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureTimeline;
    use crate::{GameResult, TeamId};
    use burn::backend::{Autodiff, NdArray};
    use chrono::NaiveDate;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn season() -> TrainingSet {
        let teams = ["a", "b", "c", "d"];
        let start = NaiveDate::from_ymd_opt(2023, 9, 7).unwrap();
        let games: Vec<GameResult> = (0..60u32)
            .map(|i| GameResult {
                date: start + chrono::Days::new((i / 2 * 7) as u64),
                week: Some(i / 2 + 1),
                home: TeamId::from(teams[(i % 4) as usize]),
                away: TeamId::from(teams[((i + 1 + i / 4) % 4) as usize]),
                home_points: Some(14 + (i * 7) % 20),
                away_points: Some(10 + (i * 5) % 17),
            })
            .filter(|g| g.home != g.away)
            .collect();
        let (table, _) = FeatureTimeline::default().build(games);
        TrainingSet::from_table(&table.impute(&Default::default()))
    }

    #[test]
    fn test_score_normalization() {
        let norm = ScoreNormalization::from_targets(&[[20.0, 10.0], [30.0, 20.0]]);
        assert!((norm.mean - 20.0).abs() < 1e-6);
        assert!((norm.denormalize(norm.normalize(27.0)) - 27.0).abs() < 1e-4);
        assert_eq!(ScoreNormalization::from_targets(&[]), ScoreNormalization::default());
    }

    #[test]
    fn test_feature_normalization_constant_column() {
        let rows = vec![[1.0f32; N_FEATURES], [1.0f32; N_FEATURES]];
        let norm = FeatureNormalization::from_inputs(&rows);
        assert!(norm.std.iter().all(|s| *s >= 0.001));
        assert!(norm.normalize_rows(&rows).iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_from_table_skips_unplayed_games() {
        let start = NaiveDate::from_ymd_opt(2023, 9, 7).unwrap();
        let game = |day: u64, home: &str, away: &str, score: Option<(u32, u32)>| GameResult {
            date: start + chrono::Days::new(day),
            week: None,
            home: TeamId::from(home),
            away: TeamId::from(away),
            home_points: score.map(|s| s.0),
            away_points: score.map(|s| s.1),
        };
        let games = vec![
            game(0, "a", "b", Some((27, 20))),
            game(7, "b", "a", Some((13, 16))),
            game(14, "a", "b", None),
        ];
        let (table, _) = FeatureTimeline::default().build(games);
        let set = TrainingSet::from_table(&table.impute(&Default::default()));

        assert_eq!(set.len(), 2);
        assert_eq!(set.targets, vec![[27.0, 20.0], [13.0, 16.0]]);
        assert_eq!(set.inputs[1][7], 1.0);
    }

    #[test]
    fn test_split_is_seeded_and_disjoint() {
        let set = season();
        let (train_a, val_a) = set.split(0.25, 42);
        let (train_b, val_b) = set.split(0.25, 42);
        assert_eq!(train_a.targets, train_b.targets);
        assert_eq!(val_a.targets, val_b.targets);
        assert_eq!(train_a.len() + val_a.len(), set.len());
        assert!(!train_a.is_empty());
    }

    #[test]
    fn test_training_reduces_loss() {
        let set = season();
        let (train, val) = set.split(0.2, 7);
        let config = TrainingConfig {
            epochs: 40,
            learning_rate: 0.05,
            hidden_dims: vec![16],
            dropout: 0.0,
            validation_fraction: 0.2,
            early_stopping_patience: 0,
            seed: 7,
        };
        let model_config = ScoreModelConfig {
            hidden_dims: config.hidden_dims.clone(),
            dropout: config.dropout,
            ..Default::default()
        };

        let device = Default::default();
        let trainer = ScoreTrainer::<TestBackend>::new(device, &model_config, config.learning_rate);
        let trained = trainer.train(&train, &val, &config).unwrap();

        let losses = &trained.history.train_losses;
        assert_eq!(losses.len(), 40);
        assert!(losses.last().unwrap() < losses.first().unwrap());
        assert!(trained.val_metrics.count > 0);
    }

    #[test]
    fn test_empty_training_set_is_error() {
        let device = Default::default();
        let trainer = ScoreTrainer::<TestBackend>::new(device, &ScoreModelConfig::default(), 0.01);
        let empty = TrainingSet::default();
        let result = trainer.train(&empty, &empty, &crate::Config::default().training);
        assert!(matches!(result, Err(GridironError::NoData(_))));
    }
}
