//! Spreadsheet ingestion.
//!
//! Images arrive base64-encoded in the first column of the first worksheet,
//! one per row. Rows become cell batch items labelled `row N` so results
//! correlate positionally with the sheet.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use thiserror::Error;

use crate::batch::BatchItem;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Not a valid spreadsheet: {0}")]
    InvalidWorkbook(String),

    #[error("Workbook has no worksheets")]
    NoWorksheet,
}

/// Read the first column of the first worksheet into cell batch items.
pub fn extract_sheet_cells(data: &[u8]) -> Result<Vec<BatchItem>, SheetError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(data))
        .map_err(|err| SheetError::InvalidWorkbook(err.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SheetError::NoWorksheet)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| SheetError::InvalidWorkbook(err.to_string()))?;

    let mut items = Vec::new();
    for (index, row) in range.rows().enumerate() {
        let value = match row.first() {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Empty) | None => String::new(),
            // Numeric or other cell content cannot hold an image; its
            // string form fails base64 decoding and reports per row.
            Some(other) => other.to_string(),
        };
        items.push(BatchItem::cell(format!("row {}", index + 1), value));
    }

    tracing::debug!(sheet = %sheet_name, rows = items.len(), "Expanded worksheet");
    Ok(items)
}
