//! Administrative boundary discovery and loading.
//!
//! A boundaries directory typically holds several admin levels from the
//! same humanitarian data exchange package (`pak_adm0`, `pak_adm1`,
//! `pak_adm2`, ...). The finest supported level wins.

use std::path::{Path, PathBuf};

use share2care_geography_models::{AdminLevel, AdministrativeRegion, RegionCollection};
use share2care_schema::cells::admin_code_from_value;
use share2care_schema::{LogicalField, candidates, probe_column};

use crate::GeoError;
use crate::vector::{
    VectorFormat, attribute_schema, is_polygonal, normalize_properties, read_vector_file,
};

/// Finds the most specific boundary file in `dir`.
///
/// ADM2 files are preferred over ADM1. File names are matched
/// case-insensitively; among several matches at the same level the
/// lexicographically first name wins, and `GeoJSON` beats Shapefile.
///
/// # Errors
///
/// Returns [`GeoError::NoBoundaryFile`] if the directory is missing or holds
/// no matching file.
pub fn locate_boundary_file(dir: &Path) -> Result<(PathBuf, AdminLevel), GeoError> {
    if !dir.is_dir() {
        return Err(GeoError::NoBoundaryFile {
            dir: dir.to_path_buf(),
        });
    }

    let mut files: Vec<(String, VectorFormat, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(format) = VectorFormat::from_path(&path) else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        files.push((stem.to_lowercase(), format, path.clone()));
    }
    files.sort();

    for level in AdminLevel::PREFERENCE {
        if let Some((_, _, path)) = files
            .iter()
            .find(|(stem, _, _)| stem.contains(level.file_pattern()))
        {
            return Ok((path.clone(), level));
        }
    }

    Err(GeoError::NoBoundaryFile {
        dir: dir.to_path_buf(),
    })
}

/// Locates and loads the boundary file in `dir`, deriving `admin_code`.
///
/// # Errors
///
/// Returns [`GeoError::NoBoundaryFile`] if no boundary file exists and
/// [`GeoError::Schema`] if none of the admin-code candidate attributes is
/// present.
pub fn load_admin_boundaries(dir: &Path) -> Result<RegionCollection, GeoError> {
    let (path, level) = locate_boundary_file(dir)?;
    log::info!(
        "Loading {:?} boundaries from {}",
        level,
        path.display()
    );
    load_boundary_file(&path, level)
}

/// Loads a specific boundary file.
///
/// # Errors
///
/// Returns [`GeoError`] if the file cannot be read or has no admin-code
/// attribute.
pub fn load_boundary_file(path: &Path, level: AdminLevel) -> Result<RegionCollection, GeoError> {
    let collection = read_vector_file(path)?;

    let non_polygonal = collection
        .features
        .iter()
        .filter(|f| !is_polygonal(f))
        .count();
    if non_polygonal > 0 {
        log::warn!(
            "{}: {non_polygonal} feature(s) without polygon geometry",
            path.display()
        );
    }

    let (geometries, attributes): (Vec<_>, Vec<_>) = collection
        .features
        .into_iter()
        .map(|f| {
            let props = normalize_properties(f.properties.as_ref());
            (f.geometry, props)
        })
        .unzip();

    let schema = attribute_schema(&attributes);
    let code_column = probe_column(&schema, &candidates(LogicalField::AdminCode))?.to_string();

    let regions: Vec<AdministrativeRegion> = geometries
        .into_iter()
        .zip(attributes)
        .map(|(geometry, attributes)| AdministrativeRegion {
            admin_code: attributes
                .get(&code_column)
                .and_then(admin_code_from_value)
                .unwrap_or_default(),
            geometry,
            attributes,
        })
        .collect();

    let missing = regions.iter().filter(|r| r.admin_code.is_empty()).count();
    if missing > 0 {
        log::warn!(
            "{}: {missing} region(s) have no value in '{code_column}'",
            path.display()
        );
    }

    log::info!(
        "Loaded {} regions keyed on '{code_column}'",
        regions.len()
    );

    Ok(RegionCollection {
        level,
        code_column,
        regions,
    })
}
