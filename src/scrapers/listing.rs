//! Category listing pages.
//!
//! # URL Pattern
//!
//! Page 1 of a category is the bare path. Later pages use an offset query in
//! steps of the site's fixed page size:
//!
//! ```text
//! https://www.isranews.org/article/isranews-news.html            page 1
//! https://www.isranews.org/article/isranews-news.html?start=10   page 2
//! https://www.isranews.org/article/isranews-news.html?start=20   page 3
//! ```

use super::element_text;
use crate::config::Pacing;
use crate::error::RenderError;
use crate::models::ArticleRecord;
use crate::render::{PageRenderer, RenderRequest};
use crate::utils::random_delay;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

/// Articles per listing page.
pub const PAGE_SIZE: u32 = 10;

static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li.fc_bloglist_item").unwrap());
static HEADLINE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3.contentheading a").unwrap());
static CREATED: Lazy<Selector> = Lazy::new(|| Selector::parse("div.value.field_created").unwrap());

/// URL of `page` (1-based) of `category`.
///
/// # Arguments
///
/// * `base` - Site root, with or without a trailing slash
/// * `category` - Listing path such as `article/isranews-news.html`
/// * `page` - Page number; 0 is treated like 1
///
/// # Returns
///
/// The bare category URL for page 1, otherwise the URL with
/// `?start=<(page - 1) * PAGE_SIZE>`.
pub fn page_url(base: &Url, category: &str, page: u32) -> String {
    let root = base.as_str().trim_end_matches('/');
    let path = category.trim_start_matches('/');
    if page <= 1 {
        format!("{root}/{path}")
    } else {
        format!("{root}/{path}?start={}", (page - 1) * PAGE_SIZE)
    }
}

/// Extract article stubs from a listing page.
///
/// # Arguments
///
/// * `html` - Listing page markup
/// * `base` - Site root that relative links are resolved against
///
/// # Returns
///
/// One stub per `li.fc_bloglist_item`, in page order. An item missing its
/// link or date keeps an empty field; a page without items yields an empty
/// vector.
pub fn parse_listing(html: &str, base: &Url) -> Vec<ArticleRecord> {
    let document = Html::parse_document(html);

    document
        .select(&ITEM)
        .map(|item| {
            let link = item.select(&HEADLINE_LINK).next();
            let title = link.map(element_text).unwrap_or_default();
            let url = link
                .and_then(|a| a.value().attr("href"))
                .map(|href| absolutize(base, href.trim()))
                .unwrap_or_default();
            let raw_date = item
                .select(&CREATED)
                .next()
                .map(element_text)
                .unwrap_or_default();
            ArticleRecord::stub(title, raw_date, url)
        })
        .collect()
}

fn absolutize(base: &Url, href: &str) -> String {
    if href.is_empty() || href.starts_with("http") {
        return href.to_string();
    }
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Renders listing pages and parses their stubs.
#[derive(Debug)]
pub struct ListingFetcher<R> {
    renderer: R,
    base: Url,
    pacing: Pacing,
}

impl<R: PageRenderer> ListingFetcher<R> {
    pub fn new(renderer: R, base: Url, pacing: Pacing) -> Self {
        Self {
            renderer,
            base,
            pacing,
        }
    }

    /// Stubs on `page` of `category`.
    ///
    /// An empty vector means the listing has run out. A render failure is
    /// returned as an error so the caller can tell the two apart.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, category: &str, page: u32) -> Result<Vec<ArticleRecord>, RenderError> {
        let url = page_url(&self.base, category, page);
        info!(%url, page, "Fetching listing page");

        let request = RenderRequest {
            url: &url,
            timeout: self.pacing.navigation_timeout,
            settle: random_delay(&self.pacing.listing_settle),
        };
        let html = self.renderer.render(&request).await?;
        let stubs = parse_listing(&html, &self.base);

        debug!(%url, count = stubs.len(), "Parsed listing page");
        Ok(stubs)
    }
}
