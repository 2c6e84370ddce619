//! CSV and spreadsheet readers.
//!
//! The format is selected by file extension. Spreadsheets are read from the
//! first sheet with the first row as header. Cells become
//! [`serde_json::Value`]s; empty cells are null.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use serde_json::Value;

use crate::{Table, TableError};

/// Supported table file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-separated values.
    Csv,
    /// Excel or `OpenDocument` workbook.
    Spreadsheet,
}

impl TableFormat {
    /// Detects the format from a path's extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

/// Reads a CSV or spreadsheet file into a [`Table`].
///
/// # Errors
///
/// * [`TableError::NotFound`] if the file does not exist
/// * [`TableError::UnsupportedFormat`] for unknown extensions
/// * [`TableError::Csv`] / [`TableError::Spreadsheet`] on parse failures
pub fn read_table(path: &Path) -> Result<Table, TableError> {
    if !path.exists() {
        return Err(TableError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let format = TableFormat::from_path(path).ok_or_else(|| TableError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let table = match format {
        TableFormat::Csv => read_csv(path)?,
        TableFormat::Spreadsheet => read_spreadsheet(path)?,
    };

    log::info!(
        "Loaded {}: {} rows, {} columns",
        path.display(),
        table.len(),
        table.columns().len()
    );

    Ok(table)
}

fn read_csv(path: &Path) -> Result<Table, TableError> {
    let csv_error = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(ToString::to_string)
        .collect();
    let mut table = Table::new(&headers);

    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(csv_error)?;
        let row: Vec<Value> = record.iter().map(text_cell).collect();
        if i == 0 && is_hashtag_row(&row) {
            log::debug!("{}: skipping HXL hashtag row", path.display());
            continue;
        }
        table.push_row(row);
    }

    Ok(table)
}

fn read_spreadsheet(path: &Path) -> Result<Table, TableError> {
    let spreadsheet_error = |source| TableError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| TableError::EmptyWorkbook {
            path: path.to_path_buf(),
        })?;
    let range = workbook.worksheet_range(&sheet).map_err(spreadsheet_error)?;
    log::debug!("{}: reading sheet '{sheet}'", path.display());

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(header_text).collect())
        .unwrap_or_default();
    let mut table = Table::new(&headers);

    for (i, row) in rows.enumerate() {
        let row: Vec<Value> = row.iter().map(spreadsheet_cell).collect();
        if i == 0 && is_hashtag_row(&row) {
            log::debug!("{}: skipping HXL hashtag row", path.display());
            continue;
        }
        if row.iter().all(Value::is_null) {
            continue;
        }
        table.push_row(row);
    }

    Ok(table)
}

fn text_cell(text: &str) -> Value {
    if text.trim().is_empty() {
        Value::Null
    } else {
        Value::String(text.to_string())
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

fn spreadsheet_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
        Data::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Data::Int(i) => Value::from(*i),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => {
            serde_json::Number::from_f64(dt.as_f64()).map_or(Value::Null, Value::Number)
        }
    }
}

/// Whether a row is an HXL hashtag row: at least one non-empty cell and
/// every non-empty cell starting with `#`.
fn is_hashtag_row(row: &[Value]) -> bool {
    let mut texts = row.iter().filter(|v| !v.is_null()).peekable();
    texts.peek().is_some()
        && texts.all(|v| v.as_str().is_some_and(|s| s.trim_start().starts_with('#')))
}
