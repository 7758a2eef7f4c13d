//! Data models for scraped articles.
//!
//! - [`ArticleRecord`]: one article, from listing stub to enriched record
//! - [`ArticleContent`]: what the article page yields
//! - [`Extraction`]: outcome of a content extraction, success or sentinel failure
//!
//! Serialized field names are the Thai column headers used by every dataset
//! this tool has written, so old exports and checkpoints load unchanged.

use crate::dates;
use serde::{Deserialize, Deserializer, Serialize};

/// Content value marking an article whose extraction failed.
///
/// Distinct from empty content; either way the article is picked up again by
/// the next run.
pub const CONTENT_ERROR_SENTINEL: &str = "[ERROR]";

/// A single news article.
///
/// The URL is the natural key: two records with the same URL are the same
/// article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleRecord {
    #[serde(rename = "หัวข้อ", deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(rename = "เนื้อหา", deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(rename = "วันที่_raw", deserialize_with = "lenient_string")]
    pub raw_date: String,
    /// `YYYY-MM-DD HH:MM:SS`, empty when the raw date is unknown.
    #[serde(rename = "วันที่", deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(rename = "URL", deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(rename = "หมวดหมู่ข่าว", deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(rename = "Tags", deserialize_with = "lenient_string")]
    pub tags: String,
    #[serde(rename = "ยอดวิว", deserialize_with = "lenient_string")]
    pub views: String,
}

/// Column headers in export order.
pub const COLUMNS: [&str; 8] = [
    "หัวข้อ",
    "เนื้อหา",
    "วันที่_raw",
    "วันที่",
    "URL",
    "หมวดหมู่ข่าว",
    "Tags",
    "ยอดวิว",
];

impl ArticleRecord {
    /// A listing stub: title, raw date and URL, nothing else yet.
    pub fn stub(title: impl Into<String>, raw_date: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            raw_date: raw_date.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// True when the content is missing or the failure sentinel.
    pub fn needs_content(&self) -> bool {
        self.content.is_empty() || self.content == CONTENT_ERROR_SENTINEL
    }

    /// Recompute [`date`](Self::date) from [`raw_date`](Self::raw_date).
    pub fn renormalize_date(&mut self) {
        self.date = dates::normalize(&self.raw_date);
    }

    /// Write an extraction outcome into the record.
    pub fn apply(&mut self, extraction: Extraction) {
        match extraction {
            Extraction::Extracted(found) => {
                self.content = found.content;
                self.category = found.categories.join(",");
                self.tags = found.tags.join(",");
                self.views = found.views.unwrap_or_default();
            }
            Extraction::Failed { .. } => {
                self.content = CONTENT_ERROR_SENTINEL.to_string();
                self.category.clear();
                self.tags.clear();
                self.views.clear();
            }
        }
    }

    /// Build a record from a tabular row keyed by header names.
    ///
    /// Unknown headers are ignored and missing columns stay empty.
    pub fn from_row<S: AsRef<str>>(headers: &[S], row: &[S]) -> Self {
        let mut rec = Self::default();
        for (header, value) in headers.iter().zip(row) {
            let value = value.as_ref().to_string();
            match header.as_ref().trim_start_matches('\u{feff}') {
                "หัวข้อ" => rec.title = value,
                "เนื้อหา" => rec.content = value,
                "วันที่_raw" => rec.raw_date = value,
                "วันที่" => rec.date = value,
                "URL" => rec.url = value,
                "หมวดหมู่ข่าว" => rec.category = value,
                "Tags" => rec.tags = value,
                "ยอดวิว" => rec.views = value,
                _ => {}
            }
        }
        rec
    }

    /// Cell values in [`COLUMNS`] order.
    pub fn fields(&self) -> [&str; 8] {
        [
            &self.title,
            &self.content,
            &self.raw_date,
            &self.date,
            &self.url,
            &self.category,
            &self.tags,
            &self.views,
        ]
    }
}

/// Body and metadata read from an article page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleContent {
    /// Paragraphs separated by blank lines.
    pub content: String,
    /// Category labels, breadcrumb excluded.
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Digits only, thousands separators removed.
    pub views: Option<String>,
}

/// Outcome of extracting one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Extracted(ArticleContent),
    /// Retries exhausted; the record gets the sentinel content.
    Failed { attempts: usize, error: String },
}

/// Accept strings, numbers, booleans and null when loading old datasets.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    })
}
