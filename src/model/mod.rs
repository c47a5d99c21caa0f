//! Neural network architecture
//!
//! A small MLP regressor over the model feature columns.

pub mod mlp;

pub use mlp::{ScoreModel, ScoreModelConfig};
