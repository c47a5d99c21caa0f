//! Prediction and inference
//!
//! Load trained models and generate score predictions.

pub mod inference;

pub use inference::{format_predictions, GamePrediction, Predictor};
