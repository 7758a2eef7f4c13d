//! JSON output: a pretty-printed array of record objects.
//!
//! Thai text is written as-is, not escaped. This is the same shape as the
//! checkpoint file, so either can seed the next run.

use crate::error::StorageError;
use crate::models::ArticleRecord;
use std::path::Path;
use tokio::fs;

pub async fn write(records: &[ArticleRecord], path: &Path) -> Result<(), StorageError> {
    let json = serde_json::to_vec_pretty(records).map_err(|e| StorageError::json(path, e))?;
    fs::write(path, json)
        .await
        .map_err(|e| StorageError::io(path, e))
}

pub async fn read(path: &Path) -> Result<Vec<ArticleRecord>, StorageError> {
    let bytes = fs::read(path).await.map_err(|e| StorageError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| StorageError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::testing::sample_records;

    #[tokio::test]
    async fn test_thai_text_not_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write(&sample_records(), &path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.trim_start().starts_with('['));
        assert!(text.contains("\"หัวข้อ\": \"ข่าวที่สอง\""));
        assert!(!text.contains("\\u0e"));
    }

    #[tokio::test]
    async fn test_reads_records_written_by_older_tools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(
            &path,
            r#"[{"หัวข้อ":"a","เนื้อหา":"body","วันที่_raw":"1 ม.ค. 2567","วันที่":"2024-01-01 00:00:00","URL":"https://x/a","หมวดหมู่ข่าว":"","Tags":"","ยอดวิว":42}]"#,
        )
        .unwrap();

        let records = read(&path).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].views, "42");
        assert_eq!(records[0].content, "body");
    }
}
