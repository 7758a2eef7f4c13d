//! Walking one category's listing pages.
//!
//! Pages are fetched strictly in order, one at a time, with a randomized pause
//! between them. The crawl stops at the first page without items, at the
//! configured end page, or at the first page that fails to render. Other
//! categories keep going either way.

use super::listing::ListingFetcher;
use crate::config::CrawlConfig;
use crate::dates;
use crate::models::ArticleRecord;
use crate::render::PageRenderer;
use crate::utils::pause;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// URLs already accepted in this run, shared by all category crawls.
#[derive(Debug, Default)]
pub struct SeenUrls {
    urls: Mutex<HashSet<String>>,
}

impl SeenUrls {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Insert `url`; false if it was already present.
    pub fn insert(&self, url: &str) -> bool {
        self.lock().insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: Into<String>> FromIterator<S> for SeenUrls {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: Mutex::new(iter.into_iter().map(Into::into).collect()),
        }
    }
}

/// Why a category crawl stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page had no listing items.
    EmptyPage,
    /// The configured end page was reached.
    EndPage,
    /// A page failed to render.
    FetchFailed(String),
}

/// Result of crawling one category.
#[derive(Debug)]
pub struct CategoryReport {
    pub category: String,
    /// Accepted stubs in discovery order.
    pub records: Vec<ArticleRecord>,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

/// Drives a [`ListingFetcher`] over one category's pages.
pub struct CategoryCrawler<'a, R> {
    fetcher: &'a ListingFetcher<R>,
    config: &'a CrawlConfig,
    seen: &'a SeenUrls,
}

impl<'a, R: PageRenderer> CategoryCrawler<'a, R> {
    pub fn new(fetcher: &'a ListingFetcher<R>, config: &'a CrawlConfig, seen: &'a SeenUrls) -> Self {
        Self {
            fetcher,
            config,
            seen,
        }
    }

    /// Accept a stub unless it is a duplicate or filtered out by date.
    fn accept(&self, stub: &mut ArticleRecord) -> bool {
        let parsed = dates::parse_date(&stub.raw_date);
        stub.date = parsed
            .as_ref()
            .map(dates::format_timestamp)
            .unwrap_or_default();

        if stub.url.is_empty() || self.seen.contains(&stub.url) {
            return false;
        }
        if let Some(threshold) = self.config.filter_date {
            match parsed {
                Some(dt) if dt >= threshold => {}
                // undated listings cannot be shown to be recent enough
                _ => return false,
            }
        }
        // another category may have claimed it since the check above
        self.seen.insert(&stub.url)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn crawl(&self, category: &str) -> CategoryReport {
        let mut records = Vec::new();
        let mut page = self.config.start_page.max(1);
        let mut pages_fetched = 0;

        let stop = loop {
            let stubs = match self.fetcher.fetch(category, page).await {
                Ok(stubs) => stubs,
                Err(e) => {
                    warn!(category, page, error = %e, "Listing page failed; stopping category");
                    break StopReason::FetchFailed(e.to_string());
                }
            };
            pages_fetched += 1;

            let found = stubs.len();
            let before = records.len();
            for mut stub in stubs {
                if self.accept(&mut stub) {
                    records.push(stub);
                }
            }
            debug!(category, page, found, accepted = records.len() - before, "Processed listing page");

            if found == 0 {
                break StopReason::EmptyPage;
            }
            if self.config.end_page != 0 && page >= self.config.end_page {
                break StopReason::EndPage;
            }
            page += 1;
            pause(&self.config.pacing.page_delay).await;
        };

        info!(
            category,
            pages = pages_fetched,
            accepted = records.len(),
            stop = ?stop,
            "Category crawl finished"
        );
        CategoryReport {
            category: category.to_string(),
            records,
            pages_fetched,
            stop,
        }
    }
}
