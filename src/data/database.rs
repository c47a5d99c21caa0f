//! SQLite storage for scraped season schedules
//!
//! Rows are kept as scraped (strings) so conversion to typed games happens in
//! one place, at load time.

use crate::data::RawGameRow;
use crate::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                season INTEGER NOT NULL,
                date TEXT NOT NULL,
                week TEXT,
                home_abbr TEXT NOT NULL,
                away_abbr TEXT NOT NULL,
                home_points TEXT,
                away_points TEXT,
                UNIQUE(season, date, home_abbr, away_abbr)
            );

            CREATE INDEX IF NOT EXISTS idx_games_season ON games(season);
            "#,
        )?;
        Ok(())
    }

    /// Insert or update one scraped row
    ///
    /// Returns false for rows without a date or both team ids; those are not
    /// stored.
    pub fn upsert_game(&self, season: i32, row: &RawGameRow) -> Result<bool> {
        let (date, home, away) = match (&row.date, &row.home_abbr, &row.away_abbr) {
            (Some(d), Some(h), Some(a)) if !h.trim().is_empty() && !a.trim().is_empty() => {
                (d.trim(), h.trim(), a.trim())
            }
            _ => return Ok(false),
        };

        self.conn.execute(
            r#"
            INSERT INTO games (season, date, week, home_abbr, away_abbr, home_points, away_points)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(season, date, home_abbr, away_abbr) DO UPDATE SET
                week = COALESCE(excluded.week, week),
                home_points = excluded.home_points,
                away_points = excluded.away_points
            "#,
            params![
                season,
                date,
                row.week,
                home,
                away,
                row.home_points,
                row.away_points,
            ],
        )?;
        Ok(true)
    }

    /// Insert multiple rows for a season
    pub fn upsert_games(&self, season: i32, rows: &[RawGameRow]) -> Result<usize> {
        let mut count = 0;
        for row in rows {
            if self.upsert_game(season, row)? {
                count += 1;
            } else {
                log::debug!("Not storing incomplete row: {:?}", row);
            }
        }
        Ok(count)
    }

    /// Rows for an inclusive season range, in season then insertion order
    pub fn get_games(&self, start_season: i32, end_season: i32) -> Result<Vec<RawGameRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date, week, home_abbr, away_abbr, home_points, away_points
            FROM games
            WHERE season BETWEEN ?1 AND ?2
            ORDER BY season, id
            "#,
        )?;
        let rows = stmt
            .query_map(params![start_season, end_season], Self::row_to_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rows for a single season
    pub fn get_season(&self, season: i32) -> Result<Vec<RawGameRow>> {
        self.get_games(season, season)
    }

    fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawGameRow> {
        Ok(RawGameRow {
            date: row.get(0)?,
            week: row.get(1)?,
            home_abbr: row.get(2)?,
            away_abbr: row.get(3)?,
            home_points: row.get(4)?,
            away_points: row.get(5)?,
        })
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let game_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;

        let scored_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM games WHERE COALESCE(home_points, '') != '' AND COALESCE(away_points, '') != ''",
            [],
            |row| row.get(0),
        )?;

        let first_season: Option<i32> = self
            .conn
            .query_row("SELECT MIN(season) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        let last_season: Option<i32> = self
            .conn
            .query_row("SELECT MAX(season) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            game_count: game_count as usize,
            scored_count: scored_count as usize,
            first_season,
            last_season,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub game_count: usize,
    pub scored_count: usize,
    pub first_season: Option<i32>,
    pub last_season: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, home: &str, away: &str, hp: Option<&str>, ap: Option<&str>) -> RawGameRow {
        RawGameRow {
            date: Some(date.to_string()),
            week: Some("1".to_string()),
            home_abbr: Some(home.to_string()),
            away_abbr: Some(away.to_string()),
            home_points: hp.map(String::from),
            away_points: ap.map(String::from),
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.game_count, 0);
        assert_eq!(stats.first_season, None);
    }

    #[test]
    fn test_upsert_updates_scores_in_place() {
        let db = Database::in_memory().unwrap();
        db.upsert_games(
            2023,
            &[
                row("2023-09-07", "kan", "det", None, None),
                row("2023-09-10", "buf", "nyj", None, None),
            ],
        )
        .unwrap();
        db.upsert_game(2023, &row("2023-09-07", "kan", "det", Some("20"), Some("21")))
            .unwrap();

        let games = db.get_season(2023).unwrap();
        assert_eq!(games.len(), 2);
        // Updated row keeps its original position
        assert_eq!(games[0].home_points.as_deref(), Some("20"));
        assert_eq!(games[1].home_abbr.as_deref(), Some("buf"));

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.game_count, 2);
        assert_eq!(stats.scored_count, 1);
    }

    #[test]
    fn test_incomplete_rows_not_stored() {
        let db = Database::in_memory().unwrap();
        let mut missing = row("2023-09-07", "kan", "det", None, None);
        missing.home_abbr = None;
        let stored = db
            .upsert_games(2023, &[missing, row("2023-09-07", "kan", "det", None, None)])
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[test]
    fn test_season_range() {
        let db = Database::in_memory().unwrap();
        db.upsert_game(2021, &row("2021-09-09", "tam", "dal", Some("31"), Some("29")))
            .unwrap();
        db.upsert_game(2022, &row("2022-09-08", "ram", "buf", Some("10"), Some("31")))
            .unwrap();
        db.upsert_game(2023, &row("2023-09-07", "kan", "det", Some("20"), Some("21")))
            .unwrap();

        assert_eq!(db.get_games(2022, 2023).unwrap().len(), 2);
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.first_season, Some(2021));
        assert_eq!(stats.last_season, Some(2023));
    }
}
