//! Pro-Football-Reference season schedule scraper
//!
//! Reads `/years/{year}/games.htm`, caching each page on disk so later runs
//! and offline runs never touch the network.

use crate::data::RawGameRow;
use crate::{GridironError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::ScheduleSource;

/// Scraper for PFR season game pages
pub struct PfrScraper {
    client: reqwest::blocking::Client,
    base_url: String,
    /// Optional cache directory for downloaded pages
    cache_dir: Option<PathBuf>,
    /// If true, only use cache (no network requests)
    offline_only: bool,
    /// If true, re-download even when a cached page exists
    force: bool,
    /// Pause after each network request
    delay: Duration,
}

impl PfrScraper {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("gridiron/0.1 (schedule research)")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(PfrScraper {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir: None,
            offline_only: false,
            force: false,
            delay: Duration::from_secs(1),
        })
    }

    /// Create scraper with a cache directory
    pub fn with_cache<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    /// Set offline-only mode (no network requests, cache must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    /// Ignore cached pages and download again
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn season_url(&self, year: i32) -> String {
        format!("{}/years/{}/games.htm", self.base_url, year)
    }

    fn cache_path(&self, year: i32) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("games_{}.html", year)))
    }

    fn load_from_cache(&self, year: i32) -> Option<String> {
        let path = self.cache_path(year)?;
        if path.exists() {
            log::debug!("Loading from cache: {}", path.display());
            std::fs::read_to_string(&path).ok()
        } else {
            None
        }
    }

    fn save_to_cache(&self, year: i32, html: &str) -> Result<()> {
        if let Some(path) = self.cache_path(year) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, html)?;
            log::debug!("Saved to cache: {}", path.display());
        }
        Ok(())
    }

    /// Page HTML for a season, from cache when allowed
    pub fn fetch_page(&self, year: i32) -> Result<String> {
        if !self.force || self.offline_only {
            if let Some(html) = self.load_from_cache(year) {
                return Ok(html);
            }
        }
        if self.offline_only {
            return Err(GridironError::NoData(format!(
                "no cached page for {} and offline mode is on",
                year
            )));
        }

        let url = self.season_url(year);
        log::info!("Fetching {}", url);
        let html = self.client.get(&url).send()?.error_for_status()?.text()?;
        self.save_to_cache(year, &html)?;
        std::thread::sleep(self.delay);
        Ok(html)
    }

    /// Parse a cached page file directly
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<RawGameRow>> {
        let html = std::fs::read_to_string(path.as_ref())?;
        parse_games_page(&html)
    }
}

impl ScheduleSource for PfrScraper {
    fn fetch_season(&self, year: i32) -> Result<Vec<RawGameRow>> {
        let html = self.fetch_page(year)?;
        let rows = parse_games_page(&html)?;
        log::info!("Season {}: {} rows", year, rows.len());
        Ok(rows)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| GridironError::Parse(format!("bad selector {}: {}", css, e)))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Direct `th`/`td` children of a row, in order
fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "th" | "td"))
        .collect()
}

fn is_separator(row: &ElementRef) -> bool {
    row.value()
        .attr("class")
        .map(|c| c.split_whitespace().any(|class| class == "thead"))
        .unwrap_or(false)
}

/// Parse the `table#games` schedule into raw rows
///
/// Cells are matched to headers by position. The first "Pts" column is the
/// visitor's score and the second the home team's. Team ids come from the
/// first two `/teams/xxx/` links in the row, visitor first.
pub fn parse_games_page(html: &str) -> Result<Vec<RawGameRow>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table#games")?;
    let header_sel = selector("thead tr")?;
    let body_row_sel = selector("tbody > tr")?;
    let link_sel = selector("a[href]")?;
    let team_re = Regex::new(r"/teams/([a-z0-9]+)/").map_err(|e| GridironError::Parse(e.to_string()))?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| GridironError::Parse("could not find games table on page".to_string()))?;

    let header_row = table
        .select(&header_sel)
        .last()
        .ok_or_else(|| GridironError::MissingColumn("table header".to_string()))?;
    let headers: Vec<String> = row_cells(&header_row).iter().map(cell_text).collect();

    let find = |name: &str, nth: usize| {
        headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_str() == name)
            .nth(nth)
            .map(|(i, _)| i)
    };
    let date_idx = find("Date", 0).ok_or_else(|| GridironError::MissingColumn("Date".to_string()))?;
    let week_idx = find("Week", 0);
    let away_pts_idx = find("Pts", 0);
    let home_pts_idx = find("Pts", 1);

    let mut rows = Vec::new();
    for row in table.select(&body_row_sel) {
        if is_separator(&row) {
            continue;
        }
        let cells = row_cells(&row);
        let text_at = |idx: Option<usize>| {
            idx.and_then(|i| cells.get(i))
                .map(cell_text)
                .filter(|t| !t.is_empty())
        };

        let teams: Vec<String> = row
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| team_re.captures(href).map(|c| c[1].to_string()))
            .take(2)
            .collect();
        let (away_abbr, home_abbr) = match teams.as_slice() {
            [away, home] => (Some(away.clone()), Some(home.clone())),
            _ => (None, None),
        };

        rows.push(RawGameRow {
            date: text_at(Some(date_idx)),
            week: text_at(week_idx),
            home_abbr,
            away_abbr,
            home_points: text_at(home_pts_idx),
            away_points: text_at(away_pts_idx),
        });
    }

    Ok(rows)
}
