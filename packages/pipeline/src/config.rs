//! Pipeline file layout, loaded from TOML.
//!
//! Every key is optional:
//!
//! ```toml
//! raw_dir = "data/raw"
//! processed_dir = "data/processed"
//!
//! [inputs]
//! boundaries_dir = "pak_admin_boundaries"
//! response = "OCHA_PAK_5W.xlsx"
//!
//! [outputs]
//! severity_map = "pak_severity_map.geojson"
//! ```
//!
//! Inputs resolve under `raw_dir`, outputs under `processed_dir`, and both
//! directories under the base directory passed to [`PipelineConfig::resolve`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Directory and file names of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding the raw inputs.
    pub raw_dir: PathBuf,
    /// Directory the outputs are written to.
    pub processed_dir: PathBuf,
    /// Input names, relative to `raw_dir`.
    pub inputs: InputFiles,
    /// Output names, relative to `processed_dir`.
    pub outputs: OutputFiles,
}

/// Raw input names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputFiles {
    /// Directory holding the ADM2/ADM1 boundary file.
    pub boundaries_dir: PathBuf,
    /// Humanitarian-response (5W) table.
    pub response: PathBuf,
    /// Price-monitoring table.
    pub prices: PathBuf,
    /// IPC hazard classification dataset.
    pub hazard: PathBuf,
}

/// Processed output names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputFiles {
    /// Severity-by-region `GeoJSON`.
    pub severity_map: PathBuf,
    /// Hazard-by-region `GeoJSON`.
    pub hazard_map: PathBuf,
    /// Activity counts per admin code (CSV).
    pub admin_counts: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            inputs: InputFiles::default(),
            outputs: OutputFiles::default(),
        }
    }
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            boundaries_dir: PathBuf::from("pak_admin_boundaries"),
            response: PathBuf::from("OCHA_PAK_5W.xlsx"),
            prices: PathBuf::from("wfp_food_prices_pak.csv"),
            hazard: PathBuf::from("ipc_pak.geojson"),
        }
    }
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            severity_map: PathBuf::from("pak_severity_map.geojson"),
            hazard_map: PathBuf::from("ipc_severity_map.geojson"),
            admin_counts: PathBuf::from("ocha_5w_admin_counts.csv"),
        }
    }
}

/// Absolute (or base-relative) locations of every pipeline file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    /// Boundary directory.
    pub boundaries_dir: PathBuf,
    /// Response table.
    pub response: PathBuf,
    /// Price table.
    pub prices: PathBuf,
    /// Hazard dataset.
    pub hazard: PathBuf,
    /// Severity map output.
    pub severity_map: PathBuf,
    /// Hazard map output.
    pub hazard_map: PathBuf,
    /// Admin counts output.
    pub admin_counts: PathBuf,
}

impl PipelineConfig {
    /// Parses a TOML config.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the text is not valid config
    /// TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        toml::de::from_str(text).map_err(|e| PipelineError::Config {
            path: None,
            message: e.to_string(),
        })
    }

    /// Loads a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        let config = toml::de::from_str(&text).map_err(|e| PipelineError::Config {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        log::debug!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Resolves every file against `base`.
    #[must_use]
    pub fn resolve(&self, base: &Path) -> PipelinePaths {
        let raw = base.join(&self.raw_dir);
        let processed = base.join(&self.processed_dir);
        PipelinePaths {
            boundaries_dir: raw.join(&self.inputs.boundaries_dir),
            response: raw.join(&self.inputs.response),
            prices: raw.join(&self.inputs.prices),
            hazard: raw.join(&self.inputs.hazard),
            severity_map: processed.join(&self.outputs.severity_map),
            hazard_map: processed.join(&self.outputs.hazard_map),
            admin_counts: processed.join(&self.outputs.admin_counts),
        }
    }
}
