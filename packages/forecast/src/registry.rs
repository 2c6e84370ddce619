//! Compile-time registry of forecasting backend configurations.
//!
//! Each backend is defined in a TOML file under `backends/`. The registry
//! embeds these at compile time and exposes them via [`all_backends`].
//! [`build_backends`] turns the configurations into long-lived backend
//! instances.

use serde::Deserialize;
use share2care_forecast_models::ForecastMethod;

use crate::backend::{ForecastBackend, UnavailableBackend};

/// A forecasting backend configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Unique identifier (e.g., `"seasonal"`, `"auto_arima"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this backend may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fallback order, lower values are tried first.
    pub priority: u32,
    /// Model-specific configuration.
    pub model: ModelConfig,
}

/// Model-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelConfig {
    /// Additive Holt-Winters.
    Seasonal {
        /// Smoothing parameters are searched on `k / grid_steps`.
        grid_steps: u32,
    },
    /// ARIMA(p, d, 0) with AIC order selection.
    AutoArima {
        /// Largest AR order considered.
        max_p: usize,
        /// Largest differencing order considered (0 or 1).
        max_d: usize,
    },
    /// Fixed-order AR(p).
    Autoregressive {
        /// AR order.
        order: usize,
    },
}

const fn default_true() -> bool {
    true
}

impl BackendConfig {
    /// Method implemented by this backend.
    #[must_use]
    pub const fn method(&self) -> ForecastMethod {
        match self.model {
            ModelConfig::Seasonal { .. } => ForecastMethod::Seasonal,
            ModelConfig::AutoArima { .. } => ForecastMethod::AutoArima,
            ModelConfig::Autoregressive { .. } => ForecastMethod::Autoregressive,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const BACKEND_TOMLS: &[(&str, &str)] = &[
    ("seasonal", include_str!("../backends/seasonal.toml")),
    ("auto_arima", include_str!("../backends/auto_arima.toml")),
    ("autoregressive", include_str!("../backends/autoregressive.toml")),
];

#[cfg(test)]
const EXPECTED_BACKEND_COUNT: usize = 3;

/// Returns all backend configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_backends() -> Vec<BackendConfig> {
    BACKEND_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse forecast backend '{name}': {e}"))
        })
        .collect()
}

/// Instantiates every registered backend in priority order.
///
/// Backends that are disabled in the registry or compiled out are
/// represented by an [`UnavailableBackend`] so they keep their place in the
/// fallback order.
#[must_use]
pub fn build_backends() -> Vec<Box<dyn ForecastBackend>> {
    let mut configs = all_backends();
    configs.sort_by_key(|c| c.priority);
    configs.iter().map(instantiate).collect()
}

fn instantiate(config: &BackendConfig) -> Box<dyn ForecastBackend> {
    if !config.enabled {
        log::debug!("Forecast backend '{}' is disabled", config.id);
        return Box::new(UnavailableBackend::new(
            config.method(),
            "disabled in the backend registry",
        ));
    }

    match config.model {
        #[cfg(feature = "seasonal")]
        ModelConfig::Seasonal { grid_steps } => {
            Box::new(crate::seasonal::SeasonalBackend::new(grid_steps))
        }
        #[cfg(feature = "auto-arima")]
        ModelConfig::AutoArima { max_p, max_d } => {
            Box::new(crate::arima::AutoArimaBackend::new(max_p, max_d))
        }
        ModelConfig::Autoregressive { order } => {
            Box::new(crate::autoregressive::AutoregressiveBackend::new(order))
        }
        #[allow(unreachable_patterns)]
        _ => {
            log::debug!("Forecast backend '{}' is not compiled in", config.id);
            Box::new(UnavailableBackend::new(
                config.method(),
                "not compiled into this build",
            ))
        }
    }
}
