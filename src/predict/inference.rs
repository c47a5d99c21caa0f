//! Model inference for predictions

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureRecord, FeatureTable, MODEL_COLUMNS};
use crate::model::ScoreModel;
use crate::training::{FeatureNormalization, ModelArtifacts, ScoreNormalization};
use crate::{GridironError, Result, TeamId};

/// Predicted score for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePrediction {
    pub date: NaiveDate,
    pub week: Option<u32>,
    pub home: TeamId,
    pub away: TeamId,
    pub pred_home_points: u32,
    pub pred_away_points: u32,
    pub pred_margin: i64,
}

impl GamePrediction {
    fn from_raw(record: &FeatureRecord, home_points: f32, away_points: f32) -> Self {
        let home = round_points(home_points);
        let away = round_points(away_points);
        GamePrediction {
            date: record.date,
            week: record.week,
            home: record.home.clone(),
            away: record.away.clone(),
            pred_home_points: home,
            pred_away_points: away,
            pred_margin: home as i64 - away as i64,
        }
    }
}

/// Whole points, clamped at zero
fn round_points(points: f32) -> u32 {
    if points.is_finite() {
        points.round().max(0.0) as u32
    } else {
        0
    }
}

/// Predictor for game scores
pub struct Predictor<B: Backend> {
    model: ScoreModel<B>,
    feature_norm: FeatureNormalization,
    score_norm: ScoreNormalization,
    device: B::Device,
}

impl<B: Backend> Predictor<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a predictor with explicit normalization params
    pub fn new(
        model: ScoreModel<B>,
        feature_norm: FeatureNormalization,
        score_norm: ScoreNormalization,
        device: B::Device,
    ) -> Self {
        Predictor {
            model,
            feature_norm,
            score_norm,
            device,
        }
    }

    /// Load predictor from a model directory
    pub fn load(model_dir: &str, device: B::Device) -> Result<Self> {
        let artifacts = ModelArtifacts::load(model_dir)?;
        let model = artifacts.load_model::<B>(model_dir, &device)?;
        log::info!(
            "Loaded model trained on seasons {}-{} ({} games)",
            artifacts.summary.start_season,
            artifacts.summary.end_season,
            artifacts.summary.train_games
        );
        Ok(Self::new(
            model,
            artifacts.feature_norm,
            artifacts.score_norm,
            device,
        ))
    }

    /// Predict scores for a batch of imputed feature records
    pub fn predict(&self, records: &[&FeatureRecord]) -> Result<Vec<GamePrediction>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let inputs: Vec<[f32; MODEL_COLUMNS.len()]> =
            records.iter().map(|r| r.model_inputs()).collect();
        let data = self.feature_norm.normalize_rows(&inputs);
        let x = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device)
            .reshape([records.len(), MODEL_COLUMNS.len()]);

        let values: Vec<f32> = self
            .model
            .forward(x)
            .into_data()
            .to_vec()
            .map_err(|e| GridironError::Model(format!("{:?}", e)))?;

        Ok(records
            .iter()
            .zip(values.chunks_exact(2))
            .map(|(record, pred)| {
                GamePrediction::from_raw(
                    record,
                    self.score_norm.denormalize(pred[0]),
                    self.score_norm.denormalize(pred[1]),
                )
            })
            .collect())
    }

    /// Predict every game of `week` in an imputed season table
    pub fn predict_week(&self, table: &FeatureTable, week: u32) -> Result<Vec<GamePrediction>> {
        let rows = table.week_rows(week);
        if rows.is_empty() {
            return Err(GridironError::NoData(format!("no games in week {}", week)));
        }
        self.predict(&rows)
    }
}

/// Format predictions as a table
pub fn format_predictions(predictions: &[GamePrediction]) -> String {
    let mut out = String::new();
    out.push_str("┌────────────┬────────┬────────┬───────┬───────┬────────┐\n");
    out.push_str("│ Date       │ Home   │ Away   │  Home │  Away │ Margin │\n");
    out.push_str("├────────────┼────────┼────────┼───────┼───────┼────────┤\n");
    for p in predictions {
        out.push_str(&format!(
            "│ {} │ {:<6} │ {:<6} │ {:>5} │ {:>5} │ {:>+6} │\n",
            p.date, p.home, p.away, p.pred_home_points, p.pred_away_points, p.pred_margin
        ));
    }
    out.push_str("└────────────┴────────┴────────┴───────┴───────┴────────┘\n");
    out
}
