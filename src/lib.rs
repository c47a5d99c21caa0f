//! NFL score prediction from chronological team features
//!
//! Walks a season's games in date order, tracking an Elo rating and a rolling
//! scoring window per team, and emits one leakage-free feature row per game.
//! The rows feed a small regression network that predicts home and away points.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a team (the site's team abbreviation, e.g. `kan`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn new(abbr: impl Into<String>) -> Self {
        TeamId(abbr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(abbr: &str) -> Self {
        TeamId(abbr.to_string())
    }
}

/// A single scheduled or completed game
///
/// Points are `None` until the game has been played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub date: NaiveDate,
    pub week: Option<u32>,
    pub home: TeamId,
    pub away: TeamId,
    pub home_points: Option<u32>,
    pub away_points: Option<u32>,
}

impl GameResult {
    /// Both scores, if the game has been played
    pub fn final_score(&self) -> Option<(u32, u32)> {
        match (self.home_points, self.away_points) {
            (Some(h), Some(a)) => Some((h, a)),
            _ => None,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum GridironError {
    #[error("Malformed game row: {0}")]
    MalformedRow(String),

    #[error("Invalid tracker update: {0}")]
    InvalidUpdate(String),

    #[error("Unparseable date: {0:?}")]
    InvalidDate(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Model not trained - run `gridiron train` first")]
    NoModel,

    #[error("No data: {0}")]
    NoData(String),
}

pub type Result<T> = std::result::Result<T, GridironError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub elo: EloSettings,
    pub features: FeatureSettings,
    pub training: TrainingConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EloSettings {
    pub k_factor: f64,
    pub home_field: f64,
    pub initial_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSettings {
    pub rolling_window: usize,
    pub default_rest_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
    pub validation_fraction: f64,
    pub early_stopping_patience: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub cache_dir: String,
    pub model_dir: String,
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            elo: EloSettings {
                k_factor: 20.0,
                home_field: 20.0,
                initial_rating: 1500.0,
            },
            features: FeatureSettings {
                rolling_window: 3,
                default_rest_days: 7,
            },
            training: TrainingConfig {
                epochs: 300,
                learning_rate: 0.05,
                hidden_dims: vec![32, 16],
                dropout: 0.1,
                validation_fraction: 0.2,
                early_stopping_patience: 30,
                seed: 42,
            },
            data: DataConfig {
                database_path: "data/gridiron.db".to_string(),
                cache_dir: "data_cache".to_string(),
                model_dir: "models".to_string(),
                base_url: "https://www.pro-football-reference.com".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridironError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| GridironError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GridironError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Elo parameters for a fresh rating tracker
    pub fn elo_config(&self) -> features::EloConfig {
        features::EloConfig {
            k_factor: self.elo.k_factor,
            home_field: self.elo.home_field,
            initial_rating: self.elo.initial_rating,
        }
    }

    /// Imputation parameters for the table-level fill pass
    pub fn imputation_policy(&self) -> features::ImputationPolicy {
        features::ImputationPolicy {
            default_rest_days: self.features.default_rest_days,
            initial_rating: self.elo.initial_rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_game(home_points: Option<u32>, away_points: Option<u32>) -> GameResult {
        GameResult {
            date: NaiveDate::from_ymd_opt(2023, 9, 10).unwrap(),
            week: Some(1),
            home: TeamId::from("kan"),
            away: TeamId::from("det"),
            home_points,
            away_points,
        }
    }

    #[test]
    fn test_final_score() {
        assert_eq!(make_game(Some(20), Some(21)).final_score(), Some((20, 21)));
        assert_eq!(make_game(Some(20), None).final_score(), None);
        assert_eq!(make_game(None, None).final_score(), None);
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.elo.k_factor, 20.0);
        assert_eq!(parsed.features.rolling_window, 3);
        assert_eq!(parsed.training.hidden_dims, vec![32, 16]);
    }
}
