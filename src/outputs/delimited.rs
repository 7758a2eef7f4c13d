//! CSV export.
//!
//! Written with a UTF-8 byte order mark and a header row of the Thai column
//! names. Reading accepts files with or without the BOM and with extra or
//! missing columns.

use crate::error::StorageError;
use crate::models::{ArticleRecord, COLUMNS};
use std::path::Path;
use tokio::fs;

const BOM: &[u8] = b"\xEF\xBB\xBF";

fn csv_error(path: &Path, source: csv::Error) -> StorageError {
    StorageError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Serialize `records` to CSV bytes, BOM first.
pub fn to_bytes(records: &[ArticleRecord], path: &Path) -> Result<Vec<u8>, StorageError> {
    let mut writer = csv::WriterBuilder::new().from_writer(BOM.to_vec());
    writer
        .write_record(COLUMNS)
        .map_err(|e| csv_error(path, e))?;
    for record in records {
        writer
            .write_record(record.fields())
            .map_err(|e| csv_error(path, e))?;
    }
    writer
        .into_inner()
        .map_err(|e| StorageError::io(path, e.into_error()))
}

pub async fn write(records: &[ArticleRecord], path: &Path) -> Result<(), StorageError> {
    let bytes = to_bytes(records, path)?;
    fs::write(path, bytes)
        .await
        .map_err(|e| StorageError::io(path, e))
}

pub async fn read(path: &Path) -> Result<Vec<ArticleRecord>, StorageError> {
    let bytes = fs::read(path).await.map_err(|e| StorageError::io(path, e))?;
    let body = bytes.strip_prefix(BOM).unwrap_or(&bytes[..]);

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let header_cells: Vec<&str> = headers.iter().collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| csv_error(path, e))?;
        let cells: Vec<&str> = row.iter().collect();
        records.push(ArticleRecord::from_row(&header_cells, &cells));
    }
    Ok(records)
}
