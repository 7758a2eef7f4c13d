//! Plain-text dump for reading.
//!
//! ```text
//! [1] <title>
//! วันที่: <normalized date>
//! หมวด: <categories>
//! Tags: <tags>
//! ยอดวิว: <views>
//! URL: <url>
//!
//! <body>
//!
//! ============================================================
//! ```

use crate::error::StorageError;
use crate::models::ArticleRecord;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;

const SEPARATOR_WIDTH: usize = 60;

/// Render every record as a numbered block.
pub fn render(records: &[ArticleRecord]) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let mut out = String::new();
    for (i, r) in records.iter().enumerate() {
        // writing to a String cannot fail
        let _ = write!(
            out,
            "[{}] {}\nวันที่: {}\nหมวด: {}\nTags: {}\nยอดวิว: {}\nURL: {}\n\n{}\n\n{}\n\n",
            i + 1,
            r.title,
            r.date,
            r.category,
            r.tags,
            r.views,
            r.url,
            r.content,
            separator
        );
    }
    out
}

pub async fn write(records: &[ArticleRecord], path: &Path) -> Result<(), StorageError> {
    fs::write(path, render(records))
        .await
        .map_err(|e| StorageError::io(path, e))
}
