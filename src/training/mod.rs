//! Model training
//!
//! Training loop, normalization, metrics tracking, and saved artifacts.

pub mod artifacts;
pub mod metrics;
pub mod trainer;

pub use artifacts::{ModelArtifacts, TrainingSummary};
pub use metrics::{RegressionMetrics, TrainingHistory};
pub use trainer::{
    FeatureNormalization, ScoreNormalization, ScoreTrainer, TrainedModel, TrainingSet,
};
