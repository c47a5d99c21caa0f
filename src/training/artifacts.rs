//! Saved model artifacts
//!
//! A trained model is stored as two files in the model directory: the burn
//! record (`score_model.mpk`) and a JSON sidecar (`artifacts.json`) holding
//! everything needed to reproduce inputs at prediction time.

use std::path::{Path, PathBuf};

use burn::tensor::backend::{AutodiffBackend, Backend};
use serde::{Deserialize, Serialize};

use crate::features::MODEL_COLUMNS;
use crate::model::{ScoreModel, ScoreModelConfig};
use crate::training::trainer::{FeatureNormalization, ScoreNormalization, TrainedModel};
use crate::{GridironError, Result};

const MODEL_FILE: &str = "score_model";
const ARTIFACTS_FILE: &str = "artifacts.json";

/// Summary of the run that produced the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub start_season: i32,
    pub end_season: i32,
    pub train_games: usize,
    pub val_games: usize,
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_val_loss: f64,
    pub val_home_mae: f64,
    pub val_away_mae: f64,
    pub val_rmse: f64,
}

/// Model configuration, normalization, and feature order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifacts {
    pub feature_columns: Vec<String>,
    pub model_config: ScoreModelConfig,
    pub feature_norm: FeatureNormalization,
    pub score_norm: ScoreNormalization,
    pub summary: TrainingSummary,
}

impl ModelArtifacts {
    pub fn new<B: AutodiffBackend>(
        trained: &TrainedModel<B>,
        model_config: ScoreModelConfig,
        summary: TrainingSummary,
    ) -> Self {
        ModelArtifacts {
            feature_columns: MODEL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            model_config,
            feature_norm: trained.feature_norm.clone(),
            score_norm: trained.score_norm,
            summary,
        }
    }

    /// Path to the burn record, without the `.mpk` extension burn appends
    pub fn model_path(model_dir: &str) -> PathBuf {
        Path::new(model_dir).join(MODEL_FILE)
    }

    pub fn artifacts_path(model_dir: &str) -> PathBuf {
        Path::new(model_dir).join(ARTIFACTS_FILE)
    }

    /// Whether both files of a saved model are present
    pub fn exists(model_dir: &str) -> bool {
        let mut model_file = Self::model_path(model_dir);
        model_file.set_extension("mpk");
        model_file.exists() && Self::artifacts_path(model_dir).exists()
    }

    /// Write the sidecar and the model weights
    pub fn save<B: Backend>(&self, model: &ScoreModel<B>, model_dir: &str) -> Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        std::fs::create_dir_all(model_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::artifacts_path(model_dir), json)?;
        model.save(&Self::model_path(model_dir).to_string_lossy())
    }

    /// Read the sidecar, checking it matches the current feature layout
    pub fn load(model_dir: &str) -> Result<Self> {
        if !Self::exists(model_dir) {
            return Err(GridironError::NoModel);
        }

        let content = std::fs::read_to_string(Self::artifacts_path(model_dir))?;
        let artifacts: ModelArtifacts = serde_json::from_str(&content)?;
        artifacts.validate()?;
        Ok(artifacts)
    }

    fn validate(&self) -> Result<()> {
        if self.feature_columns.len() != MODEL_COLUMNS.len()
            || self
                .feature_columns
                .iter()
                .zip(MODEL_COLUMNS.iter())
                .any(|(a, b)| a != b)
        {
            return Err(GridironError::Model(format!(
                "feature columns {:?} do not match {:?}",
                self.feature_columns, MODEL_COLUMNS
            )));
        }
        if self.feature_norm.mean.len() != MODEL_COLUMNS.len()
            || self.feature_norm.std.len() != MODEL_COLUMNS.len()
        {
            return Err(GridironError::Model(
                "feature normalization has the wrong width".to_string(),
            ));
        }
        Ok(())
    }

    /// Load the weights described by this sidecar
    pub fn load_model<B: Backend>(&self, model_dir: &str, device: &B::Device) -> Result<ScoreModel<B>>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        ScoreModel::load(
            device,
            &Self::model_path(model_dir).to_string_lossy(),
            &self.model_config,
        )
    }
}
