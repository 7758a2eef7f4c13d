//! Isranews page scrapers.
//!
//! Scraping follows the same two-phase pattern for every category:
//!
//! 1. **Listing**: walk a category's numbered pages and collect article stubs
//!    ([`listing`], driven page by page by [`category`])
//! 2. **Content**: render each article and pull body text and metadata
//!    ([`article`])
//!
//! # Markup
//!
//! | Page | Selector | Field |
//! |------|----------|-------|
//! | listing | `li.fc_bloglist_item` | one article stub |
//! | listing | `h3.contentheading a` | title and link |
//! | listing | `div.value.field_created` | raw date |
//! | article | `div.desc-content.field_text` | body container |
//! | article | `div.flexi.value.field_categories a` | categories (first is a breadcrumb) |
//! | article | `div.flexi.value.field_tags a` | tags |
//! | article | `div.flexi.value.field_hits` | view count |
//!
//! Missing markup is never an error: the field is simply empty.

pub mod article;
pub mod category;
pub mod listing;

use itertools::Itertools;
use scraper::ElementRef;

/// Trimmed text nodes of `element`, joined by single spaces.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .join(" ")
}

/// Trimmed text nodes of `element`, concatenated with no separator.
///
/// Used for short labels and counters, where markup may split one word or
/// number across several nodes.
pub(crate) fn compact_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}
