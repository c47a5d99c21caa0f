//! Feature extraction
//!
//! Elo ratings and rolling scoring windows, driven game by game in date
//! order, plus the table-level fill pass over the finished rows.

pub mod elo;
pub mod rolling;
pub mod table;
pub mod timeline;

pub use elo::{EloConfig, RatingChange, RatingTracker};
pub use rolling::{GameEntry, RollingSnapshot, RollingWindowTracker};
pub use table::{FeatureTable, ImputationPolicy, COLUMNS, MODEL_COLUMNS};
pub use timeline::{FeatureRecord, FeatureTimeline, TimelineIter, DEFAULT_WINDOW};

use crate::{Config, GameResult};

/// Raw and imputed tables for a set of games, using the configured trackers
pub fn build_feature_table(config: &Config, games: Vec<GameResult>) -> (FeatureTable, FeatureTable) {
    let timeline = FeatureTimeline::new(config.elo_config(), config.features.rolling_window);
    let (raw, _) = timeline.build(games);
    let imputed = raw.impute(&config.imputation_policy());
    (raw, imputed)
}
