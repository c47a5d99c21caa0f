//! Score regression MLP
//!
//! Architecture: Input(12) → Hidden(32) → ReLU → Dropout
//!                         → Hidden(16) → ReLU → Dropout
//!                         → score_head(2) = [home points, away points]
//!
//! Inputs and targets are both z-score normalized by the trainer.

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::features::MODEL_COLUMNS;
use crate::GridironError;

/// Configuration for the score model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreModelConfig {
    /// Input dimension (model feature columns)
    pub input_dim: usize,
    /// Hidden layer dimensions, at most two are used
    pub hidden_dims: Vec<usize>,
    /// Dropout rate
    pub dropout: f64,
}

impl Default for ScoreModelConfig {
    fn default() -> Self {
        ScoreModelConfig {
            input_dim: MODEL_COLUMNS.len(),
            hidden_dims: vec![32, 16],
            dropout: 0.1,
        }
    }
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

/// Two-output regressor for home and away points
#[derive(Module, Debug)]
pub struct ScoreModel<B: Backend> {
    hidden1: HiddenBlock<B>,
    hidden2: Option<HiddenBlock<B>>,
    score_head: Linear<B>,
}

impl<B: Backend> ScoreModel<B> {
    /// Create a new score model
    pub fn new(device: &B::Device, config: &ScoreModelConfig) -> Self {
        let first = config.hidden_dims.first().copied().unwrap_or(32);
        let hidden1 = HiddenBlock::new(device, config.input_dim, first, config.dropout);

        let (hidden2, head_input_dim) = match config.hidden_dims.get(1) {
            Some(&second) => (
                Some(HiddenBlock::new(device, first, second, config.dropout)),
                second,
            ),
            None => (None, first),
        };

        ScoreModel {
            hidden1,
            hidden2,
            score_head: LinearConfig::new(head_input_dim, 2).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `features` - Normalized model inputs [batch, input_dim]
    ///
    /// # Returns
    /// Normalized scores [batch, 2], home then away
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.hidden1.forward(features);
        let x = match &self.hidden2 {
            Some(h2) => h2.forward(x),
            None => x,
        };
        self.score_head.forward(x)
    }

    /// Save model to file
    pub fn save(&self, path: &str) -> crate::Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.into())
            .map_err(|e| GridironError::Model(e.to_string()))
    }

    /// Load model from file
    pub fn load(device: &B::Device, path: &str, config: &ScoreModelConfig) -> crate::Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.into(), device)
            .map_err(|e| GridironError::Model(e.to_string()))?;

        let model = Self::new(device, config);
        Ok(model.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_score_model_shapes() {
        let device = Default::default();
        let model = ScoreModel::<TestBackend>::new(&device, &ScoreModelConfig::default());

        let features = Tensor::random(
            [4, MODEL_COLUMNS.len()],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        let scores = model.forward(features);
        assert_eq!(scores.dims(), [4, 2]);
    }

    #[test]
    fn test_single_hidden_layer() {
        let device = Default::default();
        let config = ScoreModelConfig {
            input_dim: MODEL_COLUMNS.len(),
            hidden_dims: vec![8],
            dropout: 0.0,
        };
        let model = ScoreModel::<TestBackend>::new(&device, &config);

        let features = Tensor::zeros([3, MODEL_COLUMNS.len()], &device);
        assert_eq!(model.forward(features).dims(), [3, 2]);
    }

    #[test]
    fn test_save_and_load() {
        let device = Default::default();
        let config = ScoreModelConfig::default();
        let model = ScoreModel::<TestBackend>::new(&device, &config);

        let path = std::env::temp_dir().join(format!("gridiron-model-{}", std::process::id()));
        let path = path.to_string_lossy().to_string();
        model.save(&path).unwrap();
        let loaded = ScoreModel::<TestBackend>::load(&device, &path, &config).unwrap();

        let x = Tensor::<TestBackend, 2>::ones([1, MODEL_COLUMNS.len()], &device);
        let a: Vec<f32> = model.forward(x.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.forward(x).into_data().to_vec().unwrap();
        assert_eq!(a, b);

        std::fs::remove_file(format!("{}.mpk", path)).ok();
    }
}
