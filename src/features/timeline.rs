//! Chronological feature pass
//!
//! Walks games in date order. For each game the pre-game ratings and rolling
//! stats are read first, the feature row is emitted, and only then do the
//! trackers learn the game's outcome. No row sees its own result or anything
//! played later.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::elo::{EloConfig, RatingTracker};
use super::rolling::{RollingSnapshot, RollingWindowTracker};
use super::table::FeatureTable;
use crate::{GameResult, TeamId};

/// Default trailing window for the `*_last3` columns
pub const DEFAULT_WINDOW: usize = 3;

/// Feature snapshot for one game, as it stood before kickoff
///
/// Optional fields are "no data" until the table-level imputation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub date: NaiveDate,
    pub week: Option<u32>,
    pub home: TeamId,
    pub away: TeamId,
    pub home_elo: f64,
    pub away_elo: f64,
    pub home_avg_pf_last3: Option<f64>,
    pub home_avg_pa_last3: Option<f64>,
    pub home_games_played: usize,
    pub home_rest_days: Option<i64>,
    pub away_avg_pf_last3: Option<f64>,
    pub away_avg_pa_last3: Option<f64>,
    pub away_games_played: usize,
    pub away_rest_days: Option<i64>,
    pub home_points: Option<u32>,
    pub away_points: Option<u32>,
    /// Rows are always from the home side's perspective
    pub is_home: u8,
    pub elo_diff: f64,
    pub pf_diff_last3: Option<f64>,
}

impl FeatureRecord {
    /// Assemble a row from pre-game snapshots
    pub fn from_snapshots(
        game: &GameResult,
        home_elo: f64,
        away_elo: f64,
        home: &RollingSnapshot,
        away: &RollingSnapshot,
    ) -> Self {
        let pf_diff_last3 = match (home.avg_points_for, away.avg_points_for) {
            (Some(h), Some(a)) => Some(h - a),
            _ => None,
        };

        FeatureRecord {
            date: game.date,
            week: game.week,
            home: game.home.clone(),
            away: game.away.clone(),
            home_elo,
            away_elo,
            home_avg_pf_last3: home.avg_points_for,
            home_avg_pa_last3: home.avg_points_against,
            home_games_played: home.games_played,
            home_rest_days: home.rest_days,
            away_avg_pf_last3: away.avg_points_for,
            away_avg_pa_last3: away.avg_points_against,
            away_games_played: away.games_played,
            away_rest_days: away.rest_days,
            home_points: game.home_points,
            away_points: game.away_points,
            is_home: 1,
            elo_diff: home_elo - away_elo,
            pf_diff_last3,
        }
    }

    pub fn has_result(&self) -> bool {
        self.home_points.is_some() && self.away_points.is_some()
    }
}

/// Owns both trackers for the length of one chronological pass
#[derive(Debug, Clone)]
pub struct FeatureTimeline {
    ratings: RatingTracker,
    rolling: RollingWindowTracker,
    window: usize,
}

impl Default for FeatureTimeline {
    fn default() -> Self {
        Self::new(EloConfig::default(), DEFAULT_WINDOW)
    }
}

impl FeatureTimeline {
    pub fn new(elo: EloConfig, window: usize) -> Self {
        FeatureTimeline {
            ratings: RatingTracker::new(elo),
            rolling: RollingWindowTracker::new(),
            window,
        }
    }

    pub fn ratings(&self) -> &RatingTracker {
        &self.ratings
    }

    pub fn rolling(&self) -> &RollingWindowTracker {
        &self.rolling
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Pre-game feature row for a game, without recording its outcome
    pub fn peek(&self, game: &GameResult) -> FeatureRecord {
        let home_elo = self.ratings.get_rating(&game.home);
        let away_elo = self.ratings.get_rating(&game.away);
        let home = self.rolling.snapshot(&game.home, game.date, self.window);
        let away = self.rolling.snapshot(&game.away, game.date, self.window);
        FeatureRecord::from_snapshots(game, home_elo, away_elo, &home, &away)
    }

    /// Emit the row for the next game in date order, then record its result
    ///
    /// Unplayed games produce a row but leave both trackers untouched.
    pub fn step(&mut self, game: &GameResult) -> FeatureRecord {
        let record = self.peek(game);

        if let Some((home_points, away_points)) = game.final_score() {
            if game.home == game.away {
                log::warn!("Skipping update for {} playing itself on {}", game.home, game.date);
                return record;
            }
            if let Err(e) = self.rolling.append_game(
                &game.home,
                &game.away,
                game.date,
                home_points as f64,
                away_points as f64,
            ) {
                log::warn!("Skipping update: {}", e);
                return record;
            }
            if let Err(e) = self.ratings.update(
                &game.home,
                &game.away,
                game.home_points,
                game.away_points,
            ) {
                log::warn!("Rating update rejected: {}", e);
            }
        }

        record
    }

    /// Stream feature rows for a batch of games
    ///
    /// Malformed games are dropped, the rest are stable-sorted by date, and
    /// rows are produced lazily one game at a time.
    pub fn stream(self, games: Vec<GameResult>) -> TimelineIter {
        let games = sort_games(drop_malformed(games));
        TimelineIter {
            timeline: self,
            games: games.into_iter(),
        }
    }

    /// Run the whole pass and collect the raw (unimputed) table
    pub fn build(self, games: Vec<GameResult>) -> (FeatureTable, FeatureTimeline) {
        let mut iter = self.stream(games);
        let records: Vec<FeatureRecord> = iter.by_ref().collect();
        log::debug!(
            "Built {} feature rows, {} teams rated",
            records.len(),
            iter.timeline.ratings.team_count()
        );
        (FeatureTable::new(records), iter.into_timeline())
    }
}

/// Lazy chronological pass over a sorted game list
pub struct TimelineIter {
    timeline: FeatureTimeline,
    games: std::vec::IntoIter<GameResult>,
}

impl TimelineIter {
    /// Tracker state after the games consumed so far
    pub fn timeline(&self) -> &FeatureTimeline {
        &self.timeline
    }

    pub fn into_timeline(self) -> FeatureTimeline {
        self.timeline
    }
}

impl Iterator for TimelineIter {
    type Item = FeatureRecord;

    fn next(&mut self) -> Option<FeatureRecord> {
        let game = self.games.next()?;
        Some(self.timeline.step(&game))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.games.size_hint()
    }
}

/// Stable sort by date; same-day games keep their input order
pub fn sort_games(mut games: Vec<GameResult>) -> Vec<GameResult> {
    games.sort_by_key(|g| g.date);
    games
}

/// Drop games with a blank or repeated team id
fn drop_malformed(games: Vec<GameResult>) -> Vec<GameResult> {
    let total = games.len();
    let kept: Vec<GameResult> = games
        .into_iter()
        .filter(|g| {
            !g.home.as_str().trim().is_empty()
                && !g.away.as_str().trim().is_empty()
                && g.home != g.away
        })
        .collect();
    if kept.len() < total {
        log::warn!("Dropped {} malformed games before sorting", total - kept.len());
    }
    kept
}
