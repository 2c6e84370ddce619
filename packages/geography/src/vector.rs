//! Vector file reading and attribute normalization.
//!
//! `GeoJSON` is parsed natively. ESRI Shapefiles are converted to `GeoJSON`
//! on stdout by GDAL's `ogr2ogr`, which must be on `PATH`.

use std::path::Path;
use std::process::Command;

use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use share2care_schema::normalize_column_name;

use crate::GeoError;

/// Vector formats the loaders accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VectorFormat {
    /// `.geojson` / `.json`
    GeoJson,
    /// `.shp` (converted through `ogr2ogr`)
    Shapefile,
}

impl VectorFormat {
    /// Detects the format from a file extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(Self::GeoJson),
            "shp" => Some(Self::Shapefile),
            _ => None,
        }
    }
}

/// Reads a vector file into a `GeoJSON` feature collection.
///
/// # Errors
///
/// Returns [`GeoError::NotFound`] if the file does not exist, or a parse /
/// conversion error if it cannot be read.
pub fn read_vector_file(path: &Path) -> Result<FeatureCollection, GeoError> {
    if !path.is_file() {
        return Err(GeoError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = match VectorFormat::from_path(path) {
        Some(VectorFormat::GeoJson) => std::fs::read_to_string(path)?,
        Some(VectorFormat::Shapefile) => convert_with_ogr2ogr(path)?,
        None => {
            return Err(GeoError::Conversion {
                message: format!("Unsupported vector format: {}", path.display()),
            });
        }
    };

    parse_feature_collection(&content)
}

/// Parses `GeoJSON` text into a feature collection. A bare `Feature` is
/// wrapped in a single-feature collection.
///
/// # Errors
///
/// Returns [`GeoError`] if the text is not valid `GeoJSON` or is a bare
/// geometry.
pub fn parse_feature_collection(content: &str) -> Result<FeatureCollection, GeoError> {
    match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(GeoError::Conversion {
            message: "Expected a FeatureCollection, found a bare geometry".to_string(),
        }),
    }
}

/// Runs `ogr2ogr` to convert a vector file to WGS84 `GeoJSON` on stdout.
fn convert_with_ogr2ogr(path: &Path) -> Result<String, GeoError> {
    log::info!("Converting {} to GeoJSON via ogr2ogr...", path.display());

    let output = Command::new("ogr2ogr")
        .args(["-f", "GeoJSON", "-t_srs", "EPSG:4326", "/vsistdout/"])
        .arg(path)
        .output()
        .map_err(|e| GeoError::Conversion {
            message: format!("Failed to run ogr2ogr (is GDAL installed?): {e}"),
        })?;

    if !output.status.success() {
        return Err(GeoError::Conversion {
            message: format!(
                "ogr2ogr exited with status {} for {}: {}",
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| GeoError::Conversion {
        message: format!("ogr2ogr produced non-UTF-8 output: {e}"),
    })
}

/// Lower-cases and trims every attribute name of a feature.
#[must_use]
pub fn normalize_properties(properties: Option<&JsonObject>) -> JsonObject {
    properties
        .map(|props| {
            props
                .iter()
                .map(|(k, v)| (normalize_column_name(k), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Union of normalized attribute names across features, in first-seen
/// order.
#[must_use]
pub fn attribute_schema(attributes: &[JsonObject]) -> Vec<String> {
    let mut schema: Vec<String> = Vec::new();
    for props in attributes {
        for key in props.keys() {
            if !schema.iter().any(|k| k == key) {
                schema.push(key.clone());
            }
        }
    }
    schema
}

/// Whether a feature's geometry is a polygon or multipolygon.
#[must_use]
pub fn is_polygonal(feature: &Feature) -> bool {
    matches!(
        feature.geometry.as_ref().map(|g| &g.value),
        Some(geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_))
    )
}
