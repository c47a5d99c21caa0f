//! Rolling scoring window per team
//!
//! Keeps every completed game for each team in processing order and answers
//! trailing-N averages, games played and days of rest from that history.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::{GridironError, Result, TeamId};

/// One completed game from a single team's point of view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameEntry {
    pub date: NaiveDate,
    pub points_for: f64,
    pub points_against: f64,
}

/// Pre-game rolling statistics for a team
///
/// `None` means the team has no completed game yet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RollingSnapshot {
    /// Mean points scored over the window
    pub avg_points_for: Option<f64>,
    /// Mean points conceded over the window
    pub avg_points_against: Option<f64>,
    /// Completed games seen so far (whole history, not just the window)
    pub games_played: usize,
    /// Games actually averaged (min of window size and games played)
    pub window_len: usize,
    /// Whole days since the most recent completed game
    pub rest_days: Option<i64>,
}

/// Append-only per-team game history
#[derive(Debug, Clone, Default)]
pub struct RollingWindowTracker {
    history: HashMap<TeamId, Vec<GameEntry>>,
}

impl RollingWindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics over the games appended so far
    ///
    /// Entries are not filtered by `as_of`; call this before appending the
    /// game being described. A window of 0 averages nothing.
    pub fn snapshot(&self, team: &TeamId, as_of: NaiveDate, window: usize) -> RollingSnapshot {
        let entries = match self.history.get(team) {
            Some(entries) if !entries.is_empty() => entries,
            _ => return RollingSnapshot::default(),
        };

        let start = entries.len().saturating_sub(window);
        let recent = &entries[start..];
        let (avg_points_for, avg_points_against) = if recent.is_empty() {
            (None, None)
        } else {
            let n = recent.len() as f64;
            let pf = recent.iter().map(|e| e.points_for).sum::<f64>() / n;
            let pa = recent.iter().map(|e| e.points_against).sum::<f64>() / n;
            (Some(pf), Some(pa))
        };

        let rest_days = entries
            .last()
            .map(|last| (as_of - last.date).num_days());

        RollingSnapshot {
            avg_points_for,
            avg_points_against,
            games_played: entries.len(),
            window_len: recent.len(),
            rest_days,
        }
    }

    /// Append one completed game to a team's history
    ///
    /// Dates must not go backwards for a team; an out-of-order entry is
    /// rejected and the history is left as it was.
    pub fn append(
        &mut self,
        team: &TeamId,
        date: NaiveDate,
        points_for: f64,
        points_against: f64,
    ) -> Result<()> {
        if !points_for.is_finite() || !points_against.is_finite() {
            return Err(GridironError::InvalidUpdate(format!(
                "{} on {}: non-finite points",
                team, date
            )));
        }

        let entries = self.history.entry(team.clone()).or_default();
        if let Some(last) = entries.last() {
            if date < last.date {
                return Err(GridironError::InvalidUpdate(format!(
                    "{}: game on {} appended after game on {}",
                    team, date, last.date
                )));
            }
        }

        entries.push(GameEntry {
            date,
            points_for,
            points_against,
        });
        Ok(())
    }

    /// Append one completed game for both sides, or neither
    pub fn append_game(
        &mut self,
        home: &TeamId,
        away: &TeamId,
        date: NaiveDate,
        home_points: f64,
        away_points: f64,
    ) -> Result<()> {
        for team in [home, away] {
            if let Some(last) = self.history(team).last() {
                if date < last.date {
                    return Err(GridironError::InvalidUpdate(format!(
                        "{}: game on {} appended after game on {}",
                        team, date, last.date
                    )));
                }
            }
        }
        if !home_points.is_finite() || !away_points.is_finite() {
            return Err(GridironError::InvalidUpdate(format!(
                "{} vs {} on {}: non-finite points",
                home, away, date
            )));
        }
        self.append(home, date, home_points, away_points)?;
        self.append(away, date, away_points, home_points)
    }

    /// Number of completed games recorded for a team
    pub fn games_played(&self, team: &TeamId) -> usize {
        self.history.get(team).map(|h| h.len()).unwrap_or(0)
    }

    /// Full history for a team, oldest first
    pub fn history(&self, team: &TeamId) -> &[GameEntry] {
        self.history.get(team).map(|h| h.as_slice()).unwrap_or(&[])
    }
}
