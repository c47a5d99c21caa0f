//! Raw scraped game rows and their conversion to typed games

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{GameResult, GridironError, Result, TeamId};

/// Date formats seen on season pages, tried in order
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

/// One row of a season schedule, exactly as scraped or stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGameRow {
    pub date: Option<String>,
    pub week: Option<String>,
    pub home_abbr: Option<String>,
    pub away_abbr: Option<String>,
    pub home_points: Option<String>,
    pub away_points: Option<String>,
}

impl GameResult {
    /// Convert a raw row into a typed game
    ///
    /// Missing or identical teams give `MalformedRow`; a missing or
    /// unreadable date gives `InvalidDate`. Non-numeric points and weeks
    /// become `None`.
    pub fn from_raw(row: &RawGameRow) -> Result<Self> {
        let home = parse_team(row.home_abbr.as_deref())
            .ok_or_else(|| GridironError::MalformedRow(format!("missing home team: {:?}", row)))?;
        let away = parse_team(row.away_abbr.as_deref())
            .ok_or_else(|| GridironError::MalformedRow(format!("missing away team: {:?}", row)))?;
        if home == away {
            return Err(GridironError::MalformedRow(format!(
                "{} listed as both home and away",
                home
            )));
        }

        let date = parse_date(row.date.as_deref().unwrap_or(""))?;

        Ok(GameResult {
            date,
            week: row.week.as_deref().and_then(parse_week),
            home,
            away,
            home_points: row.home_points.as_deref().and_then(parse_points),
            away_points: row.away_points.as_deref().and_then(parse_points),
        })
    }
}

/// Convert raw rows, dropping rows without usable team ids
///
/// Any unparseable date aborts the whole batch, since the timeline needs a
/// total order.
pub fn prepare_games(rows: &[RawGameRow]) -> Result<Vec<GameResult>> {
    let mut games = Vec::with_capacity(rows.len());
    let mut dropped = 0;

    for row in rows {
        match GameResult::from_raw(row) {
            Ok(game) => games.push(game),
            Err(GridironError::MalformedRow(reason)) => {
                log::debug!("Dropping row: {}", reason);
                dropped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if dropped > 0 {
        log::warn!("Dropped {} rows without usable team identifiers", dropped);
    }
    Ok(games)
}

fn parse_team(abbr: Option<&str>) -> Option<TeamId> {
    let abbr = abbr?.trim();
    if abbr.is_empty() {
        None
    } else {
        Some(TeamId::new(abbr.to_lowercase()))
    }
}

/// Parse a schedule date in any of the known formats
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .ok_or_else(|| GridironError::InvalidDate(text.to_string()))
}

/// Whole, non-negative points; anything else is treated as missing
fn parse_points(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Ok(points) = text.parse::<u32>() {
        return Some(points);
    }
    // Exports sometimes write scores as floats ("24.0")
    let value: f64 = text.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

fn parse_week(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, home: Option<&str>, away: Option<&str>, hp: &str, ap: &str) -> RawGameRow {
        RawGameRow {
            date: Some(date.to_string()),
            week: Some("1".to_string()),
            home_abbr: home.map(String::from),
            away_abbr: away.map(String::from),
            home_points: Some(hp.to_string()),
            away_points: Some(ap.to_string()),
        }
    }

    #[test]
    fn test_from_raw_completed_game() {
        let game = GameResult::from_raw(&row("2023-09-07", Some("KAN"), Some("det"), "20", "21"))
            .unwrap();
        assert_eq!(game.date, NaiveDate::from_ymd_opt(2023, 9, 7).unwrap());
        assert_eq!(game.home, TeamId::from("kan"));
        assert_eq!(game.away, TeamId::from("det"));
        assert_eq!(game.final_score(), Some((20, 21)));
        assert_eq!(game.week, Some(1));
    }

    #[test]
    fn test_from_raw_unplayed_and_playoff_week() {
        let mut r = row("September 7, 2023", Some("kan"), Some("det"), "", "");
        r.week = Some("WildCard".to_string());
        let game = GameResult::from_raw(&r).unwrap();
        assert_eq!(game.home_points, None);
        assert_eq!(game.away_points, None);
        assert_eq!(game.week, None);
    }

    #[test]
    fn test_date_formats() {
        let want = NaiveDate::from_ymd_opt(2022, 1, 9).unwrap();
        for text in ["2022-01-09", "01/09/2022", "January 9, 2022", "Jan 9, 2022"] {
            assert_eq!(parse_date(text).unwrap(), want, "{}", text);
        }
        assert!(matches!(parse_date("Playoffs"), Err(GridironError::InvalidDate(_))));
    }

    #[test]
    fn test_malformed_rows_dropped_bad_dates_fatal() {
        let rows = vec![
            row("2023-09-07", Some("kan"), Some("det"), "20", "21"),
            row("2023-09-10", None, Some("det"), "1", "2"),
            row("2023-09-10", Some("  "), Some("det"), "1", "2"),
            row("2023-09-10", Some("buf"), Some("BUF"), "1", "2"),
        ];
        let games = prepare_games(&rows).unwrap();
        assert_eq!(games.len(), 1);

        let mut bad = rows;
        bad.push(row("not a date", Some("buf"), Some("nyj"), "", ""));
        assert!(matches!(prepare_games(&bad), Err(GridironError::InvalidDate(_))));
    }

    #[test]
    fn test_points_coercion() {
        assert_eq!(parse_points("17"), Some(17));
        assert_eq!(parse_points(" 24.0 "), Some(24));
        assert_eq!(parse_points("-3"), None);
        assert_eq!(parse_points("NaN"), None);
        assert_eq!(parse_points("boxscore"), None);
    }

    #[test]
    fn test_points_reject_fractions_and_overflow() {
        assert_eq!(parse_points("24.5"), None);
        assert_eq!(parse_points("1e12"), None);
        assert_eq!(parse_points("99999999999"), None);
        assert_eq!(parse_points("1e1"), Some(10));

        let raw = row("2023-09-10", Some("kan"), Some("det"), "20.5", "21");
        let game = GameResult::from_raw(&raw).unwrap();
        assert_eq!(game.home_points, None);
        assert_eq!(game.away_points, Some(21));
    }
}
