//! Season schedule scrapers

pub mod pfr;

pub use pfr::PfrScraper;

use crate::data::RawGameRow;
use crate::Result;

/// Anything that can produce raw schedule rows for a season
pub trait ScheduleSource {
    /// Fetch every row for one season
    fn fetch_season(&self, year: i32) -> Result<Vec<RawGameRow>>;

    /// Fetch an inclusive range of seasons, tagged with their year
    ///
    /// A season that fails is logged and skipped; an empty result overall is
    /// an error.
    fn fetch_seasons(&self, start: i32, end: i32) -> Result<Vec<(i32, Vec<RawGameRow>)>> {
        let mut seasons = Vec::new();
        for year in start..=end {
            match self.fetch_season(year) {
                Ok(rows) => seasons.push((year, rows)),
                Err(e) => log::warn!("Season {} skipped: {}", year, e),
            }
        }
        if seasons.is_empty() {
            return Err(crate::GridironError::NoData(format!(
                "no seasons collected for {}-{}",
                start, end
            )));
        }
        Ok(seasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridironError;

    struct FixedSource;

    impl ScheduleSource for FixedSource {
        fn fetch_season(&self, year: i32) -> Result<Vec<RawGameRow>> {
            if year == 2020 {
                return Err(GridironError::Parse("broken page".to_string()));
            }
            Ok(vec![RawGameRow {
                date: Some(format!("{}-09-10", year)),
                ..Default::default()
            }])
        }
    }

    #[test]
    fn test_failed_season_is_skipped() {
        let seasons = FixedSource.fetch_seasons(2019, 2021).unwrap();
        let years: Vec<i32> = seasons.iter().map(|(y, _)| *y).collect();
        assert_eq!(years, vec![2019, 2021]);
    }

    #[test]
    fn test_all_failed_is_error() {
        assert!(FixedSource.fetch_seasons(2020, 2020).is_err());
    }
}
