#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch builds of the dashboard's static map files.
//!
//! Wires the loaders, the severity deriver and the exporters together:
//! boundaries + response table produce the severity map, the IPC dataset
//! produces the hazard map, and the response table alone produces the
//! activity counts. Price forecasts are computed on request.

pub mod config;
pub mod progress;

use std::path::{Path, PathBuf};

use share2care_forecast::{ForecastError, ForecastRequest, forecast_prices};
use share2care_forecast_models::PriceForecast;
use share2care_geography::GeoError;
use share2care_geography::boundaries::load_admin_boundaries;
use share2care_geography::export::{ExportSummary, export_severity_geojson};
use share2care_geography::hazard::export_hazard_geojson;
use share2care_geography_models::AdminActivityCount;
use share2care_severity::{SeverityError, count_by_admin, load_severity};
use share2care_tabular::TableError;
use share2care_tabular::humanitarian::load_response_table;
use share2care_tabular::prices::{PriceTable, load_price_table};
use thiserror::Error;

pub use config::{PipelineConfig, PipelinePaths};
pub use progress::{LogProgress, NullProgress, ProgressCallback};

/// Environment variable overriding the base data directory.
pub const DATA_DIR_ENV: &str = "SHARE2CARE_DATA_DIR";

/// Errors from any pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Boundary loading or `GeoJSON` export failed.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// A table could not be loaded.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Severity derivation failed.
    #[error(transparent)]
    Severity(#[from] SeverityError),

    /// Forecasting failed.
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// I/O error writing an output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The pipeline config is missing or invalid.
    #[error(
        "Invalid pipeline config{}: {message}",
        .path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default()
    )]
    Config {
        /// Config file, when read from disk.
        path: Option<PathBuf>,
        /// Description of what went wrong.
        message: String,
    },
}

/// Result of a full map build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Severity map export.
    pub severity: ExportSummary,
    /// Hazard map export.
    pub hazard: ExportSummary,
}

/// Builds the severity-by-region map from the boundaries and response
/// table.
///
/// # Errors
///
/// Returns [`PipelineError`] if an input is missing or malformed or the
/// output cannot be written.
pub fn build_severity_geojson(paths: &PipelinePaths) -> Result<ExportSummary, PipelineError> {
    let boundaries = load_admin_boundaries(&paths.boundaries_dir)?;
    let severity = load_severity(&paths.response)?;
    log::info!(
        "Joining {} severity records ({}) onto {} regions",
        severity.records.len(),
        severity.rule,
        boundaries.len()
    );
    Ok(export_severity_geojson(
        &boundaries.regions,
        &severity.records,
        &paths.severity_map,
    )?)
}

/// Builds the hazard-by-region map from the IPC dataset.
///
/// # Errors
///
/// Returns [`PipelineError`] if the dataset is missing or malformed or the
/// output cannot be written.
pub fn build_ipc_geojson(paths: &PipelinePaths) -> Result<ExportSummary, PipelineError> {
    Ok(export_hazard_geojson(&paths.hazard, &paths.hazard_map)?)
}

/// Writes `admin_code,activity_count` rows for the response table.
///
/// # Errors
///
/// Returns [`PipelineError`] if the table cannot be loaded or the CSV
/// cannot be written.
pub fn build_admin_counts(paths: &PipelinePaths) -> Result<Vec<AdminActivityCount>, PipelineError> {
    let response = load_response_table(&paths.response)?;
    let counts = count_by_admin(&response);
    write_counts_csv(&counts, &paths.admin_counts)?;
    log::info!(
        "Wrote {} admin counts to {}",
        counts.len(),
        paths.admin_counts.display()
    );
    Ok(counts)
}

fn write_counts_csv(counts: &[AdminActivityCount], out_path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = out_path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut writer = csv::Writer::from_path(&tmp)?;
    for count in counts {
        writer.serialize(count)?;
    }
    if counts.is_empty() {
        writer.write_record(["admin_code", "activity_count"])?;
    }
    writer.flush()?;
    drop(writer);

    std::fs::rename(&tmp, out_path)?;
    Ok(())
}

/// Builds both maps, reporting one step per output.
///
/// # Errors
///
/// Returns the first [`PipelineError`] encountered.
pub fn build_all(
    paths: &PipelinePaths,
    progress: &dyn ProgressCallback,
) -> Result<BuildReport, PipelineError> {
    progress.set_total(2);

    progress.set_message(format!("Severity map -> {}", paths.severity_map.display()));
    let severity = build_severity_geojson(paths)?;
    progress.inc(1);

    progress.set_message(format!("Hazard map -> {}", paths.hazard_map.display()));
    let hazard = build_ipc_geojson(paths)?;
    progress.inc(1);

    progress.finish(format!(
        "Built {} severity and {} hazard features",
        severity.features, hazard.features
    ));

    Ok(BuildReport { severity, hazard })
}

/// Builds both maps only when either output is missing.
///
/// Returns `None` when both already exist.
///
/// # Errors
///
/// Returns the first [`PipelineError`] encountered while building.
pub fn ensure_processed_maps(
    paths: &PipelinePaths,
    progress: &dyn ProgressCallback,
) -> Result<Option<BuildReport>, PipelineError> {
    if paths.severity_map.exists() && paths.hazard_map.exists() {
        log::info!("Processed maps already present; nothing to build");
        return Ok(None);
    }
    build_all(paths, progress).map(Some)
}

/// Loads the configured price table.
///
/// # Errors
///
/// Returns [`PipelineError::Table`] if the table cannot be loaded.
pub fn load_prices(paths: &PipelinePaths) -> Result<PriceTable, PipelineError> {
    Ok(load_price_table(&paths.prices)?)
}

/// Forecasts prices from the configured price table.
///
/// # Errors
///
/// Returns [`PipelineError`] if the table cannot be loaded or forecasting
/// fails.
pub fn forecast(
    paths: &PipelinePaths,
    request: &ForecastRequest,
) -> Result<PriceForecast, PipelineError> {
    let prices = load_prices(paths)?;
    Ok(forecast_prices(&prices.observations, request)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use share2care_forecast_models::{ForecastMethod, Frequency};

    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"ADM2_PCODE": "A", "ADM2_EN": "Alpha"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type": "Feature", "properties": {"ADM2_PCODE": "B", "ADM2_EN": "Bravo"},
             "geometry": {"type": "Polygon", "coordinates": [[[1,0],[2,0],[2,1],[1,0]]]}},
            {"type": "Feature", "properties": {"ADM2_PCODE": "C", "ADM2_EN": "Charlie"},
             "geometry": {"type": "Polygon", "coordinates": [[[2,0],[3,0],[3,1],[2,0]]]}}
        ]
    }"#;

    const HAZARD: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"Phase": 3},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
        ]
    }"#;

    fn fixture(name: &str) -> (PathBuf, PipelinePaths) {
        let base = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&base);

        let config = PipelineConfig::from_toml_str(
            r#"
            [inputs]
            response = "5w.csv"
            "#,
        )
        .unwrap();
        let paths = config.resolve(&base);

        std::fs::create_dir_all(&paths.boundaries_dir).unwrap();
        std::fs::write(paths.boundaries_dir.join("pak_adm2.geojson"), BOUNDARIES).unwrap();
        std::fs::write(
            &paths.response,
            "adm2_pcode,severity,cluster\na,2.0,Food\nB,4.0,WASH\nA,5.0,Health\n",
        )
        .unwrap();
        std::fs::write(&paths.hazard, HAZARD).unwrap();

        let mut prices = String::from("date,market,commodity,price\n");
        for day in 1..=30 {
            prices.push_str(&format!("2024-01-{day:02},Lahore,Wheat,{}\n", 100 + day));
        }
        std::fs::write(&paths.prices, prices).unwrap();

        (base, paths)
    }

    fn score_of(collection: &serde_json::Value, code: &str) -> f64 {
        collection["features"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["properties"]["admin_code"] == code)
            .and_then(|f| f["properties"]["severity_score"].as_f64())
            .unwrap()
    }

    #[test]
    fn builds_all_outputs() {
        let (base, paths) = fixture("share2care_pipeline_build_all");

        let report = build_all(&paths, &NullProgress).unwrap();
        assert_eq!(report.severity.features, 3);
        assert_eq!(report.severity.matched, 2);
        assert_eq!(report.hazard.features, 1);

        let text = std::fs::read_to_string(&paths.severity_map).unwrap();
        let collection: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!((score_of(&collection, "A") - 2.0).abs() < f64::EPSILON);
        assert!((score_of(&collection, "B") - 4.0).abs() < f64::EPSILON);
        assert!(score_of(&collection, "C").abs() < f64::EPSILON);

        assert!(paths.hazard_map.exists());

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn ensure_skips_existing_maps() {
        let (base, paths) = fixture("share2care_pipeline_ensure");

        assert!(ensure_processed_maps(&paths, &NullProgress).unwrap().is_some());
        assert!(ensure_processed_maps(&paths, &NullProgress).unwrap().is_none());

        std::fs::remove_file(&paths.hazard_map).unwrap();
        assert!(ensure_processed_maps(&paths, &NullProgress).unwrap().is_some());

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn writes_admin_counts_csv() {
        let (base, paths) = fixture("share2care_pipeline_counts");

        let counts = build_admin_counts(&paths).unwrap();
        assert_eq!(counts.len(), 2);

        let text = std::fs::read_to_string(&paths.admin_counts).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["admin_code,activity_count", "A,2", "B,1"]);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn missing_response_fails_not_found() {
        let (base, paths) = fixture("share2care_pipeline_missing");
        std::fs::remove_file(&paths.response).unwrap();

        let err = build_severity_geojson(&paths).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Severity(SeverityError::Table(TableError::NotFound { .. }))
        ));

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn forecasts_configured_prices() {
        let (base, paths) = fixture("share2care_pipeline_forecast");

        let request = ForecastRequest {
            commodity: Some("wheat".to_string()),
            market: Some("LAHORE".to_string()),
            periods: 5,
            frequency: Frequency::Daily,
            method: ForecastMethod::AutoArima,
        };
        let result = forecast(&paths, &request).unwrap();
        assert_eq!(result.history.len(), 30);
        assert_eq!(result.future().len(), 5);
        assert_eq!(
            result.future()[0].date,
            chrono_date(2024, 1, 31)
        );

        let _ = std::fs::remove_dir_all(&base);
    }

    fn chrono_date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }
}
