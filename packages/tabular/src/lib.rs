#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular source loading.
//!
//! Reads spreadsheets and CSV files into a [`Table`] with normalized column
//! names. The [`humanitarian`] module derives the `admin_code` join key for
//! response (5W) tables and [`prices`] turns price-monitoring tables into
//! sorted observations.

pub mod dates;
pub mod humanitarian;
pub mod prices;
pub mod reader;

use std::path::PathBuf;

use serde_json::Value;
use share2care_schema::{ColumnNotFound, normalize_column_name};
use thiserror::Error;

pub use reader::read_table;

/// Errors that can occur while loading tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// The input file does not exist.
    #[error("Input file not found: {}", path.display())]
    NotFound {
        /// Path that was expected.
        path: PathBuf,
    },

    /// The file extension is not a supported table format.
    #[error("Unsupported table format: {}", path.display())]
    UnsupportedFormat {
        /// Offending path.
        path: PathBuf,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        /// File being read.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Spreadsheet parsing failed.
    #[error("Spreadsheet error in {}: {source}", path.display())]
    Spreadsheet {
        /// File being read.
        path: PathBuf,
        /// Underlying spreadsheet error.
        source: calamine::Error,
    },

    /// The workbook has no sheets.
    #[error("Workbook has no sheets: {}", path.display())]
    EmptyWorkbook {
        /// File being read.
        path: PathBuf,
    },

    /// A required column could not be resolved.
    #[error("Schema error: {0}")]
    Schema(#[from] ColumnNotFound),
}

/// An in-memory table with normalized (trimmed, lower-cased) column names.
///
/// Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates an empty table, normalizing the header names.
    #[must_use]
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            columns: headers
                .iter()
                .map(|h| normalize_column_name(h.as_ref()))
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Normalized column names in source order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, padding with nulls or truncating to the table width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Index of the first column named `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a column named `name` exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of column `name`, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Cell of column `name` in row `row`.
    #[must_use]
    pub fn cell(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[index])
    }

    /// Sets column `name` to `values`, replacing it if it already exists.
    ///
    /// Missing trailing values are filled with nulls.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) {
        let name = normalize_column_name(name);
        let index = self.column_index(&name).unwrap_or_else(|| {
            self.columns.push(name);
            for row in &mut self.rows {
                row.push(Value::Null);
            }
            self.columns.len() - 1
        });

        let mut values = values.into_iter();
        for row in &mut self.rows {
            row[index] = values.next().unwrap_or(Value::Null);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_headers() {
        let table = Table::new(&["  Adm2_Pcode ", "PIN"]);
        assert_eq!(table.columns(), &["adm2_pcode", "pin"]);
    }

    #[test]
    fn pads_short_rows() {
        let mut table = Table::new(&["a", "b", "c"]);
        table.push_row(vec![json!(1)]);
        table.push_row(vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(table.rows()[0], vec![json!(1), Value::Null, Value::Null]);
        assert_eq!(table.rows()[1].len(), 3);
    }

    #[test]
    fn set_column_appends_and_replaces() {
        let mut table = Table::new(&["a"]);
        table.push_row(vec![json!("x")]);
        table.push_row(vec![json!("y")]);

        table.set_column("B", vec![json!(1), json!(2)]);
        assert_eq!(table.columns(), &["a", "b"]);
        assert_eq!(table.cell(1, "b"), Some(&json!(2)));

        table.set_column("a", vec![json!("z")]);
        assert_eq!(table.cell(0, "a"), Some(&json!("z")));
        assert_eq!(table.cell(1, "a"), Some(&Value::Null));
    }

    #[test]
    fn column_values_in_row_order() {
        let mut table = Table::new(&["a", "b"]);
        table.push_row(vec![json!(1), json!(2)]);
        table.push_row(vec![json!(3), json!(4)]);
        let values: Vec<&Value> = table.column_values("b").unwrap().collect();
        assert_eq!(values, vec![&json!(2), &json!(4)]);
        assert!(table.column_values("missing").is_none());
    }
}
