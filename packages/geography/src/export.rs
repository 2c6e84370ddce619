//! Severity geo-join and `GeoJSON` export.
//!
//! The join is a left join on the boundary set: every region is exported
//! exactly once, and regions without a severity record get `0.0`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geo::BoundingRect;
use geojson::{Feature, FeatureCollection};
use share2care_geography_models::{
    ADMIN_CODE_ATTRIBUTE, AdministrativeRegion, SEVERITY_SCORE_ATTRIBUTE, SeverityRecord,
};

use crate::GeoError;

/// Summary of a written `GeoJSON` export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Path the collection was written to.
    pub path: PathBuf,
    /// Number of features written.
    pub features: usize,
    /// Number of features that carried a source score (as opposed to the
    /// `0.0` fill value).
    pub matched: usize,
}

/// Left-joins severity records onto regions.
///
/// Returns one feature per region, in region order, carrying the region's
/// attributes plus `admin_code` and `severity_score`, and the number of
/// regions that had a non-null score.
#[must_use]
pub fn join_severity(
    regions: &[AdministrativeRegion],
    severity: &[SeverityRecord],
) -> (Vec<Feature>, usize) {
    let mut lookup: BTreeMap<&str, Option<f64>> = BTreeMap::new();
    for record in severity {
        lookup
            .entry(record.admin_code.as_str())
            .or_insert(record.severity_score);
    }

    let mut matched = 0;
    let features = regions
        .iter()
        .map(|region| {
            let score = lookup.get(region.admin_code.as_str()).copied().flatten();
            if score.is_some() {
                matched += 1;
            }

            let mut properties = region.attributes.clone();
            properties.insert(
                ADMIN_CODE_ATTRIBUTE.to_string(),
                serde_json::Value::String(region.admin_code.clone()),
            );
            properties.insert(
                SEVERITY_SCORE_ATTRIBUTE.to_string(),
                score_value(Some(score.unwrap_or(0.0))),
            );

            Feature {
                bbox: None,
                geometry: region.geometry.clone(),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    (features, matched)
}

/// Joins severity onto regions and writes the result to `out_path`.
///
/// # Errors
///
/// Returns [`GeoError`] if the output cannot be written.
pub fn export_severity_geojson(
    regions: &[AdministrativeRegion],
    severity: &[SeverityRecord],
    out_path: &Path,
) -> Result<ExportSummary, GeoError> {
    let (features, matched) = join_severity(regions, severity);
    log::info!(
        "Joined severity onto {} regions ({matched} matched, {} filled with 0)",
        features.len(),
        features.len() - matched
    );

    let count = features.len();
    write_feature_collection(features, out_path)?;

    Ok(ExportSummary {
        path: out_path.to_path_buf(),
        features: count,
        matched,
    })
}

/// Writes features as a `GeoJSON` `FeatureCollection` with a computed
/// `bbox`, creating parent directories as needed.
///
/// The collection is written to a sibling `.tmp` file first and renamed
/// into place.
///
/// # Errors
///
/// Returns [`GeoError`] on I/O or serialization failure.
pub fn write_feature_collection(features: Vec<Feature>, out_path: &Path) -> Result<(), GeoError> {
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let collection = FeatureCollection {
        bbox: collection_bbox(&features),
        features,
        foreign_members: None,
    };

    let file_name = out_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| GeoError::Conversion {
            message: format!("Invalid output path: {}", out_path.display()),
        })?;
    let tmp = out_path.with_file_name(format!("{file_name}.tmp"));

    std::fs::write(&tmp, serde_json::to_string(&collection)?)?;
    std::fs::rename(&tmp, out_path)?;

    log::info!(
        "Wrote {} features to {}",
        collection.features.len(),
        out_path.display()
    );
    Ok(())
}

/// Converts an optional score to a JSON number (or null).
pub(crate) fn score_value(score: Option<f64>) -> serde_json::Value {
    score
        .and_then(serde_json::Number::from_f64)
        .map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Bounding box `[min_x, min_y, max_x, max_y]` over all feature
/// geometries, or `None` if no geometry converts.
fn collection_bbox(features: &[Feature]) -> Option<Vec<f64>> {
    let mut bounds: Option<[f64; 4]> = None;

    for geometry in features.iter().filter_map(|f| f.geometry.as_ref()) {
        let Ok(geo_geom) = geo::Geometry::<f64>::try_from(geometry.clone()) else {
            continue;
        };
        let Some(rect) = geo_geom.bounding_rect() else {
            continue;
        };
        let (min, max) = (rect.min(), rect.max());
        bounds = Some(match bounds {
            None => [min.x, min.y, max.x, max.y],
            Some([x0, y0, x1, y1]) => [x0.min(min.x), y0.min(min.y), x1.max(max.x), y1.max(max.y)],
        });
    }

    bounds.map(|b| b.to_vec())
}
