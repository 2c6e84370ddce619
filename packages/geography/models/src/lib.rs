#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative region and severity types.
//!
//! Regions are immutable reference data loaded from boundary files.
//! Severity records are derived per run and only ever persisted as part of
//! the joined `GeoJSON` export.

use serde::{Deserialize, Serialize};

/// Attribute name written to exported features for the join key.
pub const ADMIN_CODE_ATTRIBUTE: &str = "admin_code";

/// Attribute name written to exported features for the severity score.
pub const SEVERITY_SCORE_ATTRIBUTE: &str = "severity_score";

/// Administrative level of a boundary file, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    /// Second-level divisions (districts).
    Adm2,
    /// First-level divisions (provinces).
    Adm1,
}

impl AdminLevel {
    /// Levels in order of preference (most specific first).
    pub const PREFERENCE: [Self; 2] = [Self::Adm2, Self::Adm1];

    /// Substring a boundary file name must contain for this level.
    #[must_use]
    pub const fn file_pattern(self) -> &'static str {
        match self {
            Self::Adm2 => "adm2",
            Self::Adm1 => "adm1",
        }
    }
}

/// A single administrative region from a boundary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdministrativeRegion {
    /// Canonical join key (upper-cased, trimmed). Empty when the source
    /// feature had no value in the code column.
    pub admin_code: String,
    /// Boundary geometry (polygon or multipolygon).
    pub geometry: Option<geojson::Geometry>,
    /// Descriptive attributes with normalized (lower-case) names.
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// All regions loaded from one boundary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCollection {
    /// Administrative level inferred from the file name.
    pub level: AdminLevel,
    /// Attribute the join key was derived from (e.g. `"adm2_pcode"`).
    pub code_column: String,
    /// Regions in file order.
    pub regions: Vec<AdministrativeRegion>,
}

impl RegionCollection {
    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the collection has no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// A severity score for one admin code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityRecord {
    /// Join key into the boundary set.
    pub admin_code: String,
    /// Score on the nominal 0-5 scale. `None` when the source cell was
    /// empty or non-numeric; filled with `0.0` at export.
    pub severity_score: Option<f64>,
}

/// An area from a pre-classified hazard (IPC-style) dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardArea {
    /// Join key when the dataset carries an admin-code column.
    pub admin_code: Option<String>,
    /// Phase value taken as-is from the dataset: a number when the cell is
    /// numeric, the original text when it is not (e.g. `"3+"`), null when
    /// empty.
    pub severity_score: serde_json::Value,
    /// Area geometry.
    pub geometry: Option<geojson::Geometry>,
    /// Descriptive attributes with normalized names.
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Count of response-table rows per admin code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminActivityCount {
    /// Admin code.
    pub admin_code: String,
    /// Number of rows reporting activity in this region.
    pub activity_count: u64,
}
