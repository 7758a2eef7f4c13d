//! Excel workbook export.
//!
//! One worksheet: a header row, then one row per record. Every cell is
//! written as text so view counts and dates survive a reload unchanged.

use crate::error::StorageError;
use crate::models::{ArticleRecord, COLUMNS};
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// Longest text a cell may hold.
pub const MAX_CELL_CHARS: usize = 32_767;

fn sheet_error(path: &Path, message: impl ToString) -> StorageError {
    StorageError::Spreadsheet {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn clip(cell: &str) -> &str {
    match cell.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => &cell[..cut],
        None => cell,
    }
}

/// Serialize `records` to an in-memory workbook.
pub fn to_bytes(records: &[ArticleRecord]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, cell) in record.fields().into_iter().enumerate() {
            let clipped = clip(cell);
            if clipped.len() < cell.len() {
                warn!(url = %record.url, column = COLUMNS[col], "Cell too long for spreadsheet; truncated");
            }
            sheet.write_string(row, col as u16, clipped)?;
        }
    }

    workbook.save_to_buffer()
}

pub async fn write(records: &[ArticleRecord], path: &Path) -> Result<(), StorageError> {
    let bytes = to_bytes(records).map_err(|e| sheet_error(path, e))?;
    fs::write(path, bytes)
        .await
        .map_err(|e| StorageError::io(path, e))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Records from the first worksheet. Numeric cells come back as their text.
pub fn read(path: &Path) -> Result<Vec<ArticleRecord>, StorageError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| sheet_error(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| sheet_error(path, "workbook has no worksheets"))?
        .map_err(|e| sheet_error(path, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => return Ok(Vec::new()),
    };

    Ok(rows
        .map(|row| {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            ArticleRecord::from_row(&headers, &cells)
        })
        .collect())
}
