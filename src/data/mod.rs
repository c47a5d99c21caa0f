//! Data ingestion and storage
//!
//! Season page scraping, SQLite storage of raw rows, and conversion of raw
//! rows into typed games.

pub mod database;
pub mod raw;
pub mod scrapers;

pub use database::Database;
pub use raw::{prepare_games, RawGameRow};

use crate::{GameResult, Result};

/// Typed games for an inclusive season range, ready for the timeline
pub fn load_games(db: &Database, start_season: i32, end_season: i32) -> Result<Vec<GameResult>> {
    let rows = db.get_games(start_season, end_season)?;
    prepare_games(&rows)
}
