#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Column-name normalization and ordered candidate probing.
//!
//! Humanitarian datasets name the same logical field many different ways
//! (`adm2_pcode`, `admin2Pcode`, `pcode`, ...). Every loader resolves its
//! fields through [`probe_column`] against the ordered candidate lists in
//! the [`registry`], so the string literals live in one place
//! (`columns.toml`) instead of being scattered across loaders.

pub mod cells;
pub mod registry;

pub use registry::{ColumnCandidates, LogicalField, candidates};

/// No column of a source's schema matched any candidate for a logical
/// field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No {field} column found (tried: {})", .candidates.join(", "))]
pub struct ColumnNotFound {
    /// Logical field being resolved (e.g. `"admin_code"`).
    pub field: String,
    /// Every candidate that was tried, in probe order.
    pub candidates: Vec<String>,
}

/// Trims and lower-cases a raw column or attribute name.
#[must_use]
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Returns the first candidate (in candidate order, not schema order) that
/// is present in `schema`.
///
/// `schema` is expected to hold already-normalized names.
///
/// # Errors
///
/// Returns [`ColumnNotFound`] listing every candidate tried when none is
/// present.
pub fn probe_column<'c, S: AsRef<str>>(
    schema: &[S],
    candidates: &'c ColumnCandidates,
) -> Result<&'c str, ColumnNotFound> {
    find_column(schema, candidates).ok_or_else(|| ColumnNotFound {
        field: candidates.name.clone(),
        candidates: candidates.candidates.clone(),
    })
}

/// Like [`probe_column`] but returns `None` instead of an error, for
/// fields that are optional in a source.
#[must_use]
pub fn find_column<'c, S: AsRef<str>>(
    schema: &[S],
    candidates: &'c ColumnCandidates,
) -> Option<&'c str> {
    candidates
        .candidates
        .iter()
        .find(|candidate| schema.iter().any(|col| col.as_ref() == candidate.as_str()))
        .map(String::as_str)
}
