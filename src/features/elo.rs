//! Elo rating system for team strength estimation
//!
//! One rating per team, moved after every completed game. The home-field
//! bonus only enters the expectation; stored ratings never include it.

use std::collections::HashMap;

use crate::{GridironError, Result, TeamId};

/// Elo rating configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloConfig {
    /// K-factor: how much ratings change per game
    pub k_factor: f64,
    /// Home-field bonus in rating points (expectation only)
    pub home_field: f64,
    /// Starting rating for new teams
    pub initial_rating: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        EloConfig {
            k_factor: 20.0,
            home_field: 20.0,
            initial_rating: 1500.0,
        }
    }
}

/// Result of a single rating update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingChange {
    /// Home expectation used for the update (includes home-field bonus)
    pub expected_home: f64,
    /// Actual home result: 1 win, 0.5 tie, 0 loss
    pub actual_home: f64,
    pub home_delta: f64,
    pub away_delta: f64,
}

/// Per-team Elo ratings
#[derive(Debug, Clone)]
pub struct RatingTracker {
    ratings: HashMap<TeamId, f64>,
    config: EloConfig,
}

impl Default for RatingTracker {
    fn default() -> Self {
        Self::new(EloConfig::default())
    }
}

impl RatingTracker {
    pub fn new(config: EloConfig) -> Self {
        RatingTracker {
            ratings: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &EloConfig {
        &self.config
    }

    /// Get current rating for a team (returns initial if unknown)
    pub fn get_rating(&self, team: &TeamId) -> f64 {
        self.ratings
            .get(team)
            .copied()
            .unwrap_or(self.config.initial_rating)
    }

    /// Expected score (0-1) for the home team, home-field bonus applied
    pub fn expected_home_score(&self, home: &TeamId, away: &TeamId) -> f64 {
        let home_rating = self.get_rating(home) + self.config.home_field;
        let away_rating = self.get_rating(away);
        expected_score(home_rating, away_rating)
    }

    /// Update ratings after a game (call AFTER reading pre-game ratings)
    ///
    /// Rejects missing scores and self-play without touching any rating.
    pub fn update(
        &mut self,
        home: &TeamId,
        away: &TeamId,
        home_score: Option<u32>,
        away_score: Option<u32>,
    ) -> Result<RatingChange> {
        let (home_score, away_score) = match (home_score, away_score) {
            (Some(h), Some(a)) => (h, a),
            _ => {
                return Err(GridironError::InvalidUpdate(format!(
                    "{} vs {}: both scores are required",
                    home, away
                )))
            }
        };
        if home == away {
            return Err(GridironError::InvalidUpdate(format!(
                "{} cannot play itself",
                home
            )));
        }

        let expected_home = self.expected_home_score(home, away);

        // Actual result: 1 = home win, 0.5 = tie, 0 = away win
        let actual_home = match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Equal => 0.5,
            std::cmp::Ordering::Less => 0.0,
        };

        let home_delta = self.config.k_factor * (actual_home - expected_home);
        let away_delta = self.config.k_factor * ((1.0 - actual_home) - (1.0 - expected_home));

        let home_new = self.get_rating(home) + home_delta;
        let away_new = self.get_rating(away) + away_delta;
        self.ratings.insert(home.clone(), home_new);
        self.ratings.insert(away.clone(), away_new);

        Ok(RatingChange {
            expected_home,
            actual_home,
            home_delta,
            away_delta,
        })
    }

    /// Number of teams with a stored rating
    pub fn team_count(&self) -> usize {
        self.ratings.len()
    }
}

/// Logistic expectation of `rating` against `opponent`
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((opponent - rating) / 400.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(abbr: &str) -> TeamId {
        TeamId::from(abbr)
    }

    #[test]
    fn test_initial_ratings() {
        let elo = RatingTracker::default();
        assert_eq!(elo.get_rating(&team("kan")), 1500.0);
        assert_eq!(elo.get_rating(&team("zzz")), 1500.0);
        // Reads never insert
        assert_eq!(elo.team_count(), 0);
    }

    #[test]
    fn test_expected_score_home_field() {
        let elo = RatingTracker::default();
        let expected = elo.expected_home_score(&team("a"), &team("b"));
        // +20 points of home field on equal teams
        assert!(expected > 0.5 && expected < 0.55);
        assert!((expected_score(1500.0, 1500.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_home_win_exact_arithmetic() {
        let mut elo = RatingTracker::default();
        elo.update(&team("a"), &team("b"), Some(24), Some(10)).unwrap();

        let expected_home = 1.0 / (1.0 + 10f64.powf(-20.0 / 400.0));
        let want = 1500.0 + 20.0 * (1.0 - expected_home);
        assert!((elo.get_rating(&team("a")) - want).abs() < 1e-9);
        assert!((elo.get_rating(&team("a")) - 1509.42).abs() < 0.01);
        assert!((elo.get_rating(&team("b")) - (3000.0 - want)).abs() < 1e-9);
    }

    #[test]
    fn test_stored_rating_excludes_home_field() {
        let mut elo = RatingTracker::default();
        elo.update(&team("a"), &team("b"), Some(17), Some(17)).unwrap();
        // A tie at home is below expectation, so the home side loses a little
        assert!(elo.get_rating(&team("a")) < 1500.0);
        assert!(elo.get_rating(&team("b")) > 1500.0);
    }

    #[test]
    fn test_zero_sum_updates() {
        let mut elo = RatingTracker::default();
        let games = [
            ("a", "b", 30, 20),
            ("b", "c", 14, 28),
            ("c", "a", 21, 21),
            ("a", "c", 3, 38),
        ];
        for (home, away, hs, as_) in games {
            let before = elo.get_rating(&team(home)) + elo.get_rating(&team(away));
            let change = elo
                .update(&team(home), &team(away), Some(hs), Some(as_))
                .unwrap();
            assert!((change.home_delta + change.away_delta).abs() < 1e-9);
            let after = elo.get_rating(&team(home)) + elo.get_rating(&team(away));
            assert!((before - after).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rejected_update_does_not_mutate() {
        let mut elo = RatingTracker::default();
        assert!(elo.update(&team("a"), &team("b"), None, Some(10)).is_err());
        assert!(elo.update(&team("a"), &team("b"), Some(10), None).is_err());
        assert!(elo.update(&team("a"), &team("a"), Some(10), Some(3)).is_err());
        assert_eq!(elo.team_count(), 0);
        assert_eq!(elo.get_rating(&team("a")), 1500.0);
    }

    #[test]
    fn test_custom_config() {
        let mut elo = RatingTracker::new(EloConfig {
            k_factor: 40.0,
            home_field: 0.0,
            initial_rating: 1000.0,
        });
        elo.update(&team("a"), &team("b"), Some(1), Some(0)).unwrap();
        assert!((elo.get_rating(&team("a")) - 1020.0).abs() < 1e-9);
        assert!((elo.get_rating(&team("b")) - 980.0).abs() < 1e-9);
    }
}
