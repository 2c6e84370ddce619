//! Compile-time registry of column candidate lists.
//!
//! The lists are defined in `columns.toml` and embedded via
//! [`include_str!`]. Each logical field maps to an ordered list of column
//! names, most specific first.

use serde::Deserialize;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// A logical field that loaders resolve against a source schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LogicalField {
    /// Administrative region code (join key).
    AdminCode,
    /// Observation date of a price row.
    Date,
    /// Observed price.
    Price,
    /// Commodity name.
    Commodity,
    /// Market name.
    Market,
    /// People-in-need style count used to scale severity.
    PeopleInNeed,
    /// IPC phase classification.
    IpcPhase,
}

/// Ordered candidate column names for one logical field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnCandidates {
    /// Logical field name (matches [`LogicalField`] in `snake_case`).
    pub name: String,
    /// Candidate column names, most specific first.
    pub candidates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ColumnsFile {
    field: Vec<ColumnCandidates>,
}

const COLUMNS_TOML: &str = include_str!("../columns.toml");

/// Returns every configured field with its candidate list.
///
/// # Panics
///
/// Panics if `columns.toml` is malformed (this is a compile-time guarantee
/// since the file is embedded).
#[must_use]
pub fn all_fields() -> Vec<ColumnCandidates> {
    toml::de::from_str::<ColumnsFile>(COLUMNS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse columns.toml: {e}"))
        .field
}

/// Returns the candidate list for a logical field.
///
/// # Panics
///
/// Panics if the field has no entry in `columns.toml`.
#[must_use]
pub fn candidates(field: LogicalField) -> ColumnCandidates {
    all_fields()
        .into_iter()
        .find(|f| f.name == field.as_ref())
        .unwrap_or_else(|| panic!("No candidates configured for field '{field}'"))
}
