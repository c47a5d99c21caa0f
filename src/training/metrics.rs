//! Training metrics and evaluation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Regression metrics for one pass over a dataset, in points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean squared error in normalized space (the training loss)
    pub loss: f64,
    /// Sum of absolute home point errors
    pub home_abs_sum: f64,
    /// Sum of absolute away point errors
    pub away_abs_sum: f64,
    /// Sum of squared home point errors
    pub home_sq_sum: f64,
    /// Sum of squared away point errors
    pub away_sq_sum: f64,
    /// Games evaluated
    pub count: usize,
}

impl RegressionMetrics {
    pub fn new(loss: f64) -> Self {
        RegressionMetrics {
            loss,
            ..Self::default()
        }
    }

    /// Record one prediction against the actual score
    pub fn update(&mut self, predicted: (f32, f32), actual: (f32, f32)) {
        let home_err = (predicted.0 - actual.0) as f64;
        let away_err = (predicted.1 - actual.1) as f64;
        self.home_abs_sum += home_err.abs();
        self.away_abs_sum += away_err.abs();
        self.home_sq_sum += home_err * home_err;
        self.away_sq_sum += away_err * away_err;
        self.count += 1;
    }

    pub fn home_mae(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.home_abs_sum / self.count as f64
        }
    }

    pub fn away_mae(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.away_abs_sum / self.count as f64
        }
    }

    /// Root mean squared error over both sides
    pub fn rmse(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            ((self.home_sq_sum + self.away_sq_sum) / (2 * self.count) as f64).sqrt()
        }
    }

    /// Mean of home and away MAE
    pub fn score_mae(&self) -> f64 {
        (self.home_mae() + self.away_mae()) / 2.0
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.4} | MAE home: {:.2} away: {:.2} | RMSE: {:.2}",
            self.loss,
            self.home_mae(),
            self.away_mae(),
            self.rmse()
        )
    }
}

/// Training history for tracking progress
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub val_score_maes: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Record metrics for an epoch; returns true if it is the new best
    pub fn record_epoch(
        &mut self,
        epoch: usize,
        train: &RegressionMetrics,
        val: &RegressionMetrics,
    ) -> bool {
        self.train_losses.push(train.loss);
        self.val_losses.push(val.loss);
        self.val_score_maes.push(val.score_mae());

        if val.loss < self.best_val_loss {
            self.best_val_loss = val.loss;
            self.best_epoch = epoch;
            true
        } else {
            false
        }
    }

    /// Check if we should early stop
    pub fn should_early_stop(&self, patience: usize) -> bool {
        if patience == 0 || self.val_losses.len() < patience {
            return false;
        }
        let current_epoch = self.val_losses.len() - 1;
        current_epoch - self.best_epoch >= patience
    }

    pub fn epochs_run(&self) -> usize {
        self.val_losses.len()
    }
}
