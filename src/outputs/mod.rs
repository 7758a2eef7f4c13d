//! Output generation for every supported export format.
//!
//! # Submodules
//!
//! - [`delimited`]: CSV with a UTF-8 BOM so spreadsheet apps detect Thai text
//! - [`spreadsheet`]: single-sheet `.xlsx` workbook
//! - [`json`]: pretty-printed array of objects
//! - [`text`]: human-readable dump, one block per article
//!
//! Every format but `txt` can also be loaded back, which is how a run picks
//! up the dataset written by the previous one.
//!
//! # Output naming
//!
//! ```text
//! <basename>.csv | <basename>.xlsx | <basename>.json | <basename>.txt
//! ```

pub mod delimited;
pub mod json;
pub mod spreadsheet;
pub mod text;

use crate::config::ExportFormat;
use crate::error::StorageError;
use crate::models::ArticleRecord;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Write `records` to `path` in `format`.
///
/// Each record's normalized date is recomputed from its raw date first, so
/// reloaded records always reflect the current date parsing.
#[instrument(level = "info", skip_all, fields(path = %path.display(), %format, records = records.len()))]
pub async fn export(
    records: &mut [ArticleRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<PathBuf, StorageError> {
    for record in records.iter_mut() {
        record.renormalize_date();
    }

    match format {
        ExportFormat::Csv => delimited::write(records, path).await?,
        ExportFormat::Excel => spreadsheet::write(records, path).await?,
        ExportFormat::Json => json::write(records, path).await?,
        ExportFormat::Txt => text::write(records, path).await?,
    }

    info!("Wrote export");
    Ok(path.to_path_buf())
}

/// Records from an earlier export, or `None` if `path` does not exist.
#[instrument(level = "info", skip_all, fields(path = %path.display(), %format))]
pub async fn load_previous(
    path: &Path,
    format: ExportFormat,
) -> Result<Option<Vec<ArticleRecord>>, StorageError> {
    if !tokio::fs::try_exists(path)
        .await
        .map_err(|e| StorageError::io(path, e))?
    {
        return Ok(None);
    }

    let records = match format {
        ExportFormat::Csv => delimited::read(path).await?,
        ExportFormat::Excel => spreadsheet::read(path)?,
        ExportFormat::Json => json::read(path).await?,
        ExportFormat::Txt => {
            return Err(StorageError::UnsupportedLoad {
                path: path.to_path_buf(),
                format: format.name(),
            });
        }
    };

    info!(records = records.len(), "Loaded previous export");
    Ok(Some(records))
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::models::ArticleRecord;

    /// Two enriched records and one failed one.
    pub fn sample_records() -> Vec<ArticleRecord> {
        let mut a = ArticleRecord::stub(
            "ศาลรับฟ้อง \"คดีใหญ่\", ต่อ",
            "15 มกราคม 2567 เวลา 09:30",
            "https://www.isranews.org/article/isranews-news/1-a.html",
        );
        a.content = "ย่อหน้าแรก\n\nย่อหน้าที่สอง, มีจุลภาค".into();
        a.category = "ข่าว,ภาคใต้".into();
        a.tags = "ศาล,คดี".into();
        a.views = "1520".into();

        let mut b = ArticleRecord::stub(
            "ข่าวที่สอง",
            "2024-02-01",
            "https://www.isranews.org/article/isranews-news/2-b.html",
        );
        b.content = "เนื้อหา".into();

        let mut c = ArticleRecord::stub(
            "ไม่มีวันที่",
            "",
            "https://www.isranews.org/article/isranews-news/3-c.html",
        );
        c.content = crate::models::CONTENT_ERROR_SENTINEL.into();

        vec![a, b, c]
    }

    /// Sample records as they look after export.
    pub fn exported_sample() -> Vec<ArticleRecord> {
        let mut records = sample_records();
        for r in &mut records {
            r.renormalize_date();
        }
        records
    }
}
