//! IPC-style hazard classification datasets.
//!
//! These arrive already classified per area, so the phase value is used as
//! the severity score without rescaling and the geometry is exported as-is.

use std::path::Path;

use geojson::Feature;
use serde_json::Value;
use share2care_geography_models::{
    ADMIN_CODE_ATTRIBUTE, HazardArea, SEVERITY_SCORE_ATTRIBUTE,
};
use share2care_schema::cells::{admin_code_from_value, cell_as_f64};
use share2care_schema::{LogicalField, candidates, find_column};

use crate::GeoError;
use crate::export::{ExportSummary, score_value, write_feature_collection};
use crate::vector::{attribute_schema, normalize_properties, read_vector_file};

/// Loads a hazard dataset, assigning each area's phase as its severity.
///
/// When no phase-like attribute exists every area scores `0.0`. When an
/// admin-code attribute exists the join key is derived as well.
///
/// # Errors
///
/// Returns [`GeoError::NotFound`] if the file does not exist, or a parse
/// error if it is not a readable vector file.
pub fn load_hazard_areas(path: &Path) -> Result<Vec<HazardArea>, GeoError> {
    let collection = read_vector_file(path)?;

    let (geometries, attributes): (Vec<_>, Vec<_>) = collection
        .features
        .into_iter()
        .map(|f| (f.geometry, normalize_properties(f.properties.as_ref())))
        .unzip();

    let schema = attribute_schema(&attributes);
    let phase_candidates = candidates(LogicalField::IpcPhase);
    let code_candidates = candidates(LogicalField::AdminCode);
    let phase_column = find_column(&schema, &phase_candidates);
    let code_column = find_column(&schema, &code_candidates);

    match phase_column {
        Some(col) => log::info!("{}: using '{col}' as severity", path.display()),
        None => log::warn!(
            "{}: no phase column found; all areas score 0",
            path.display()
        ),
    }

    let mut textual = 0usize;
    let areas = geometries
        .into_iter()
        .zip(attributes)
        .map(|(geometry, attributes)| {
            let severity_score = match phase_column {
                Some(col) => phase_score(attributes.get(col)),
                None => score_value(Some(0.0)),
            };
            if severity_score.is_string() {
                textual += 1;
            }
            let admin_code = code_column
                .and_then(|col| attributes.get(col))
                .and_then(admin_code_from_value);
            HazardArea {
                admin_code,
                severity_score,
                geometry,
                attributes,
            }
        })
        .collect();

    if textual > 0 {
        log::warn!(
            "{}: {textual} areas have a non-numeric phase; exported as text",
            path.display()
        );
    }

    Ok(areas)
}

/// Numeric phases become numbers, other non-empty text passes through
/// unchanged.
fn phase_score(cell: Option<&Value>) -> Value {
    let Some(cell) = cell else {
        return Value::Null;
    };
    if let Some(phase) = cell_as_f64(cell) {
        return score_value(Some(phase));
    }
    match cell {
        Value::String(text) if !text.trim().is_empty() => Value::String(text.clone()),
        _ => Value::Null,
    }
}

/// Converts hazard areas to features carrying `severity_score` (and
/// `admin_code` where known).
#[must_use]
pub fn hazard_features(areas: &[HazardArea]) -> Vec<Feature> {
    areas
        .iter()
        .map(|area| {
            let mut properties = area.attributes.clone();
            if let Some(code) = &area.admin_code {
                properties.insert(
                    ADMIN_CODE_ATTRIBUTE.to_string(),
                    Value::String(code.clone()),
                );
            }
            properties.insert(
                SEVERITY_SCORE_ATTRIBUTE.to_string(),
                area.severity_score.clone(),
            );
            Feature {
                bbox: None,
                geometry: area.geometry.clone(),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect()
}

/// Loads the hazard dataset at `input` and writes the scored collection to
/// `out_path`.
///
/// # Errors
///
/// Returns [`GeoError`] if the input cannot be read or the output written.
pub fn export_hazard_geojson(input: &Path, out_path: &Path) -> Result<ExportSummary, GeoError> {
    let areas = load_hazard_areas(input)?;
    let matched = areas.iter().filter(|a| !a.severity_score.is_null()).count();
    let features = hazard_features(&areas);
    let count = features.len();

    write_feature_collection(features, out_path)?;

    Ok(ExportSummary {
        path: out_path.to_path_buf(),
        features: count,
        matched,
    })
}
