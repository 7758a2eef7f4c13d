//! Run configuration.
//!
//! Everything a run needs is folded into two immutable values built once in
//! `main` and handed to the pipeline:
//!
//! - [`SiteConfig`]: the target site (base URL and category table), built in
//!   for isranews.org and replaceable with a YAML file
//! - [`CrawlConfig`]: what this run does (categories, page range, date
//!   filter, workers, export format, pacing)
//!
//! # Site file
//!
//! ```yaml
//! base_url: https://www.isranews.org
//! categories:
//!   - name: ข่าว
//!     path: article/isranews-news.html
//! ```

use crate::error::ConfigError;
use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.isranews.org";
pub const DEFAULT_OUTPUT_BASE: &str = "isranews";
pub const DEFAULT_CHECKPOINT: &str = "isranews_checkpoint.json";
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Paths of custom categories must start with this.
pub const CUSTOM_CATEGORY_PREFIX: &str = "article/";

/// A named listing path on the site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub name: String,
    pub path: String,
}

/// The crawl target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    pub categories: Vec<Category>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let categories = [
            ("ข่าว", "article/isranews-news.html"),
            ("ศูนย์ข่าวเพื่อชุมชน", "article/community/comm-news.html"),
            ("ศูนย์ข่าวภาคใต้", "article/south-news/other-news.html"),
            ("ศูนย์ข่าวนโยบายสาธารณะ", "article/thaireform/thaireform-news.html"),
            ("ศูนย์ข่าวสืบสวน", "article/investigative/investigate-news.html"),
        ]
        .into_iter()
        .map(|(name, path)| Category {
            name: name.to_string(),
            path: path.to_string(),
        })
        .collect();

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            categories,
        }
    }
}

impl SiteConfig {
    /// Load a site description from YAML.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let site_file_error = |message: String| ConfigError::SiteFile {
            path: path.to_path_buf(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| site_file_error(e.to_string()))?;
        let site: SiteConfig =
            serde_yaml::from_str(&text).map_err(|e| site_file_error(e.to_string()))?;
        if site.categories.is_empty() {
            return Err(site_file_error("no categories defined".to_string()));
        }
        site.base()?;
        Ok(site)
    }

    /// Parsed base URL.
    pub fn base(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })
    }

    /// Resolve a category selection to listing paths.
    ///
    /// The selection is `all`, or a comma-separated list of category names,
    /// 1-based indices into the table, or custom `article/...` paths.
    /// Unrecognised list entries are dropped; an unrecognised single entry
    /// falls back to the first category.
    pub fn resolve_categories(&self, selection: &str) -> Vec<String> {
        let selection = selection.trim().to_lowercase();
        if selection == "all" {
            return self.categories.iter().map(|c| c.path.clone()).collect();
        }

        if selection.contains(',') {
            return selection
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|item| self.resolve_one(item))
                .collect();
        }

        self.resolve_one(&selection)
            .or_else(|| self.categories.first().map(|c| c.path.clone()))
            .into_iter()
            .collect()
    }

    fn resolve_one(&self, item: &str) -> Option<String> {
        if let Some(cat) = self.categories.iter().find(|c| c.name.to_lowercase() == item) {
            return Some(cat.path.clone());
        }
        if let Ok(index) = item.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|i| self.categories.get(i))
                .map(|c| c.path.clone());
        }
        item.starts_with(CUSTOM_CATEGORY_PREFIX)
            .then(|| item.to_string())
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    Json,
    Txt,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Csv,
        ExportFormat::Excel,
        ExportFormat::Json,
        ExportFormat::Txt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Json => "json",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            other => other.name(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "json" => Ok(ExportFormat::Json),
            "txt" | "text" => Ok(ExportFormat::Txt),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Inclusive range a random delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const fn millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    #[cfg(test)]
    pub const ZERO: DelayRange = DelayRange::millis(0, 0);
}

/// Backoff for article extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: usize,
    /// Delay after the first failure, doubled after each further failure.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_secs(1),
        }
    }
}

/// Timeouts and advisory rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub navigation_timeout: Duration,
    /// Wait after a listing page loads.
    pub listing_settle: DelayRange,
    /// Wait after an article page loads.
    pub article_settle: DelayRange,
    /// Sleep between listing pages of one category.
    pub page_delay: DelayRange,
    pub retry: RetryPolicy,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(20),
            listing_settle: DelayRange::millis(1000, 1800),
            article_settle: DelayRange::millis(1500, 2300),
            page_delay: DelayRange::millis(1500, 3000),
            retry: RetryPolicy::default(),
        }
    }
}

impl Pacing {
    /// No waiting at all; same retry budget.
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(5),
            listing_settle: DelayRange::ZERO,
            article_settle: DelayRange::ZERO,
            page_delay: DelayRange::ZERO,
            retry: RetryPolicy {
                base_delay: Duration::ZERO,
                max_jitter: Duration::ZERO,
                ..RetryPolicy::default()
            },
        }
    }
}

/// Settings for one run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlConfig {
    /// Listing paths relative to the base URL.
    pub categories: Vec<String>,
    pub start_page: u32,
    /// 0 crawls until a page has no items.
    pub end_page: u32,
    /// Listings older than this are skipped; so are undated ones while it is set.
    pub filter_date: Option<NaiveDateTime>,
    pub max_workers: usize,
    pub format: ExportFormat,
    pub output_base: String,
    pub checkpoint_path: PathBuf,
    pub pacing: Pacing,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            start_page: 1,
            end_page: 1,
            filter_date: None,
            max_workers: DEFAULT_MAX_WORKERS,
            format: ExportFormat::Csv,
            output_base: DEFAULT_OUTPUT_BASE.to_string(),
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT),
            pacing: Pacing::default(),
        }
    }
}

impl CrawlConfig {
    /// Check invariants and drop duplicate categories.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.categories = self.categories.into_iter().unique().collect();
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        if self.start_page < 1 {
            return Err(ConfigError::InvalidStartPage(self.start_page));
        }
        if self.end_page != 0 && self.end_page < self.start_page {
            return Err(ConfigError::InvalidPageRange {
                start: self.start_page,
                end: self.end_page,
            });
        }
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        Ok(self)
    }

    /// `<output_base>.<ext>`
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.output_base, self.format.extension()))
    }

    /// Concurrency for the listing phase.
    pub fn category_workers(&self) -> usize {
        self.max_workers.min(self.categories.len()).max(1)
    }
}
