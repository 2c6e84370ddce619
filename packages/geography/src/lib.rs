#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary loading and severity map export.
//!
//! Locates the most specific boundary file in a directory, normalizes its
//! attributes and derives the `admin_code` join key. Severity scores are
//! left-joined onto the boundaries and written as `GeoJSON` for the
//! dashboard overlays. Pre-classified IPC hazard datasets take a parallel
//! path through [`hazard`].

pub mod boundaries;
pub mod export;
pub mod hazard;
pub mod vector;

use std::path::PathBuf;

use share2care_schema::ColumnNotFound;
use thiserror::Error;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// A required input file does not exist.
    #[error("Input file not found: {}", path.display())]
    NotFound {
        /// Path that was expected.
        path: PathBuf,
    },

    /// No ADM2/ADM1 boundary file exists in the boundaries directory.
    #[error("No ADM2/ADM1 boundary file found in {}", dir.display())]
    NoBoundaryFile {
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// A required attribute could not be resolved.
    #[error("Schema error: {0}")]
    Schema(#[from] ColumnNotFound),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Vector data could not be converted.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl From<geojson::Error> for GeoError {
    fn from(e: geojson::Error) -> Self {
        Self::GeoJson(Box::new(e))
    }
}
