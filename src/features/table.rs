//! Feature table and the table-level imputation pass
//!
//! The chronological pass leaves "no data" gaps; they are filled here, once,
//! from statistics over the whole table.

use serde::{Deserialize, Serialize};
use std::io::Write;

use super::timeline::FeatureRecord;
use crate::Result;

/// Output column order for CSV export
pub const COLUMNS: [&str; 19] = [
    "date",
    "week",
    "home",
    "away",
    "home_elo",
    "away_elo",
    "home_avg_pf_last3",
    "home_avg_pa_last3",
    "home_games_played",
    "home_rest_days",
    "away_avg_pf_last3",
    "away_avg_pa_last3",
    "away_games_played",
    "away_rest_days",
    "home_points",
    "away_points",
    "is_home",
    "elo_diff",
    "pf_diff_last3",
];

/// Numeric columns fed to the score model, in order
pub const MODEL_COLUMNS: [&str; 12] = [
    "home_elo",
    "away_elo",
    "elo_diff",
    "home_avg_pf_last3",
    "home_avg_pa_last3",
    "away_avg_pf_last3",
    "away_avg_pa_last3",
    "home_games_played",
    "away_games_played",
    "home_rest_days",
    "away_rest_days",
    "pf_diff_last3",
];

/// Fill values for the imputation pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImputationPolicy {
    /// Rest days for a team's first game
    pub default_rest_days: i64,
    /// Replacement for a non-finite rating
    pub initial_rating: f64,
}

impl Default for ImputationPolicy {
    fn default() -> Self {
        ImputationPolicy {
            default_rest_days: 7,
            initial_rating: 1500.0,
        }
    }
}

/// Column means of the four rolling-average columns
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RollingMeans {
    pub home_avg_pf: f64,
    pub home_avg_pa: f64,
    pub away_avg_pf: f64,
    pub away_avg_pa: f64,
}

/// Ordered feature rows, one per game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn new(records: Vec<FeatureRecord>) -> Self {
        FeatureTable { records }
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FeatureRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Means over the observed (non-missing) entries of each rolling column
    ///
    /// A column with no observed entry at all has mean 0.
    pub fn rolling_means(&self) -> RollingMeans {
        RollingMeans {
            home_avg_pf: column_mean(self.records.iter().map(|r| r.home_avg_pf_last3)),
            home_avg_pa: column_mean(self.records.iter().map(|r| r.home_avg_pa_last3)),
            away_avg_pf: column_mean(self.records.iter().map(|r| r.away_avg_pf_last3)),
            away_avg_pa: column_mean(self.records.iter().map(|r| r.away_avg_pa_last3)),
        }
    }

    /// Fill every "no data" gap, producing a new table
    ///
    /// Rolling averages get their column mean, rest days the policy default,
    /// non-finite ratings the initial rating. `elo_diff` and `pf_diff_last3`
    /// are then derived from the filled values. Running this on an already
    /// imputed table changes nothing.
    pub fn impute(&self, policy: &ImputationPolicy) -> FeatureTable {
        let means = self.rolling_means();
        let fill_rating = |r: f64| if r.is_finite() { r } else { policy.initial_rating };

        let records = self
            .records
            .iter()
            .map(|r| {
                let home_elo = fill_rating(r.home_elo);
                let away_elo = fill_rating(r.away_elo);
                let home_avg_pf = r.home_avg_pf_last3.unwrap_or(means.home_avg_pf);
                let away_avg_pf = r.away_avg_pf_last3.unwrap_or(means.away_avg_pf);

                FeatureRecord {
                    home_elo,
                    away_elo,
                    home_avg_pf_last3: Some(home_avg_pf),
                    home_avg_pa_last3: Some(r.home_avg_pa_last3.unwrap_or(means.home_avg_pa)),
                    home_rest_days: Some(r.home_rest_days.unwrap_or(policy.default_rest_days)),
                    away_avg_pf_last3: Some(away_avg_pf),
                    away_avg_pa_last3: Some(r.away_avg_pa_last3.unwrap_or(means.away_avg_pa)),
                    away_rest_days: Some(r.away_rest_days.unwrap_or(policy.default_rest_days)),
                    is_home: 1,
                    elo_diff: home_elo - away_elo,
                    pf_diff_last3: Some(home_avg_pf - away_avg_pf),
                    ..r.clone()
                }
            })
            .collect();

        FeatureTable { records }
    }

    /// True once no optional feature column has a gap
    pub fn is_imputed(&self) -> bool {
        self.records.iter().all(|r| {
            r.home_avg_pf_last3.is_some()
                && r.home_avg_pa_last3.is_some()
                && r.home_rest_days.is_some()
                && r.away_avg_pf_last3.is_some()
                && r.away_avg_pa_last3.is_some()
                && r.away_rest_days.is_some()
                && r.pf_diff_last3.is_some()
        })
    }

    /// Rows with both final scores, usable as training targets
    pub fn training_rows(&self) -> Vec<&FeatureRecord> {
        self.records.iter().filter(|r| r.has_result()).collect()
    }

    /// Model inputs for every row, in [`MODEL_COLUMNS`] order
    pub fn feature_matrix(&self) -> Vec<[f32; MODEL_COLUMNS.len()]> {
        self.records.iter().map(FeatureRecord::model_inputs).collect()
    }

    /// Rows for a given week
    pub fn week_rows(&self, week: u32) -> Vec<&FeatureRecord> {
        self.records
            .iter()
            .filter(|r| r.week == Some(week))
            .collect()
    }

    /// Write the table as CSV with the [`COLUMNS`] header
    pub fn write_csv<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}", COLUMNS.join(","))?;
        for r in &self.records {
            writeln!(
                out,
                "{},{},{},{},{:.6},{:.6},{},{},{},{},{},{},{},{},{},{},{},{:.6},{}",
                r.date,
                opt(r.week),
                r.home,
                r.away,
                r.home_elo,
                r.away_elo,
                opt_f(r.home_avg_pf_last3),
                opt_f(r.home_avg_pa_last3),
                r.home_games_played,
                opt(r.home_rest_days),
                opt_f(r.away_avg_pf_last3),
                opt_f(r.away_avg_pa_last3),
                r.away_games_played,
                opt(r.away_rest_days),
                opt(r.home_points),
                opt(r.away_points),
                r.is_home,
                r.elo_diff,
                opt_f(r.pf_diff_last3),
            )?;
        }
        Ok(())
    }
}

impl FeatureRecord {
    /// Model input vector in [`MODEL_COLUMNS`] order; remaining gaps become 0
    pub fn model_inputs(&self) -> [f32; MODEL_COLUMNS.len()] {
        let f = |v: Option<f64>| v.unwrap_or(0.0) as f32;
        [
            self.home_elo as f32,
            self.away_elo as f32,
            self.elo_diff as f32,
            f(self.home_avg_pf_last3),
            f(self.home_avg_pa_last3),
            f(self.away_avg_pf_last3),
            f(self.away_avg_pa_last3),
            self.home_games_played as f32,
            self.away_games_played as f32,
            f(self.home_rest_days.map(|d| d as f64)),
            f(self.away_rest_days.map(|d| d as f64)),
            f(self.pf_diff_last3),
        ]
    }
}

fn column_mean(values: impl Iterator<Item = Option<f64>>) -> f64 {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_f(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureTimeline;
    use crate::{GameResult, TeamId};
    use chrono::NaiveDate;

    fn make_game(day: u32, home: &str, away: &str, score: Option<(u32, u32)>) -> GameResult {
        GameResult {
            date: NaiveDate::from_ymd_opt(2023, 9, day).unwrap(),
            week: Some(day / 7 + 1),
            home: TeamId::from(home),
            away: TeamId::from(away),
            home_points: score.map(|s| s.0),
            away_points: score.map(|s| s.1),
        }
    }

    fn season() -> FeatureTable {
        let games = vec![
            make_game(3, "a", "b", Some((24, 10))),
            make_game(3, "c", "d", Some((20, 17))),
            make_game(10, "a", "c", Some((31, 28))),
            make_game(10, "b", "d", Some((6, 13))),
            make_game(17, "d", "a", None),
            make_game(17, "e", "b", None),
        ];
        FeatureTimeline::default().build(games).0
    }

    #[test]
    fn test_rolling_means_ignore_gaps() {
        let table = season();
        let means = table.rolling_means();
        // Observed home_avg_pf: a=24 (row 3), b=10 (row 4), d=15 (row 5)
        assert!((means.home_avg_pf - (24.0 + 10.0 + 15.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_impute_fills_every_gap() {
        let table = season();
        assert!(!table.is_imputed());

        let imputed = table.impute(&ImputationPolicy::default());
        assert!(imputed.is_imputed());
        assert_eq!(imputed.len(), table.len());

        let first = &imputed.records()[0];
        assert_eq!(first.home_rest_days, Some(7));
        assert_eq!(first.home_avg_pf_last3, Some(table.rolling_means().home_avg_pf));
        assert_eq!(first.is_home, 1);
        let diff = first.home_avg_pf_last3.unwrap() - first.away_avg_pf_last3.unwrap();
        assert_eq!(first.pf_diff_last3, Some(diff));

        // Observed values are kept as they were
        let third = &imputed.records()[2];
        assert_eq!(third.home_avg_pf_last3, Some(24.0));
        assert_eq!(third.home_rest_days, Some(7));
        assert_eq!(third.home_games_played, 1);
        assert_eq!(third.pf_diff_last3, table.records()[2].pf_diff_last3);
    }

    #[test]
    fn test_impute_is_idempotent() {
        let policy = ImputationPolicy::default();
        let once = season().impute(&policy);
        let twice = once.impute(&policy);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_finite_rating_falls_back() {
        let mut records = season().into_records();
        records[0].home_elo = f64::NAN;
        let imputed = FeatureTable::new(records).impute(&ImputationPolicy::default());
        assert_eq!(imputed.records()[0].home_elo, 1500.0);
        assert_eq!(imputed.records()[0].elo_diff, 0.0);
    }

    #[test]
    fn test_empty_column_mean_is_zero() {
        let table = FeatureTimeline::default()
            .build(vec![make_game(3, "a", "b", None)])
            .0;
        let imputed = table.impute(&ImputationPolicy::default());
        assert_eq!(imputed.records()[0].home_avg_pf_last3, Some(0.0));
    }

    #[test]
    fn test_training_and_week_rows() {
        let table = season();
        assert_eq!(table.training_rows().len(), 4);
        assert_eq!(table.week_rows(3).len(), 2);
        assert!(table.week_rows(3).iter().all(|r| !r.has_result()));
    }

    #[test]
    fn test_model_inputs_order() {
        let imputed = season().impute(&ImputationPolicy::default());
        let row = &imputed.records()[2];
        let x = row.model_inputs();
        assert_eq!(x.len(), MODEL_COLUMNS.len());
        assert_eq!(x[0], row.home_elo as f32);
        assert_eq!(x[3], 24.0);
        assert_eq!(x[7], 1.0);
        assert_eq!(x[9], 7.0);
    }

    #[test]
    fn test_feature_matrix_zero_fills_raw_gaps() {
        let table = season();
        let matrix = table.feature_matrix();
        assert_eq!(matrix.len(), table.len());
        assert_eq!(matrix[0][3], 0.0);
        assert_eq!(matrix[0][9], 0.0);
        assert_eq!(matrix[0][0], 1500.0);
    }

    #[test]
    fn test_csv_header_and_rows() {
        let table = season();
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), COLUMNS.join(","));
        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(first.len(), COLUMNS.len());
        assert_eq!(first[0], "2023-09-03");
        assert_eq!(first[2], "a");
        assert_eq!(first[6], "");
        assert_eq!(first[14], "24");
        assert_eq!(text.lines().count(), table.len() + 1);
    }
}
