//! Forecasting backend capability interface.
//!
//! A backend is constructed once (from the [`crate::registry`]) and reused
//! across requests. Each call to [`ForecastBackend::fit`] produces a
//! [`FittedModel`] for one series.

use share2care_forecast_models::ForecastMethod;

use crate::ForecastError;
use crate::series::RegularSeries;

/// One predicted value with optional confidence bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Point forecast.
    pub value: f64,
    /// Lower bound of the 95% interval.
    pub lower: Option<f64>,
    /// Upper bound of the 95% interval.
    pub upper: Option<f64>,
}

impl Prediction {
    /// A prediction with a symmetric interval of `half_width` around
    /// `value`.
    #[must_use]
    pub fn with_interval(value: f64, half_width: f64) -> Self {
        Self {
            value,
            lower: Some(value - half_width),
            upper: Some(value + half_width),
        }
    }
}

/// A forecasting strategy.
///
/// Implementations must be `Send + Sync` so a single long-lived instance
/// can serve every forecast request.
pub trait ForecastBackend: Send + Sync {
    /// Method this backend implements.
    fn method(&self) -> ForecastMethod;

    /// Whether the backend can be used in this build and configuration.
    fn is_available(&self) -> bool;

    /// Fits the model to a regular series.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::BackendUnavailable`] if the backend cannot
    /// run, or [`ForecastError::Fit`] if fitting fails.
    fn fit(&self, series: &RegularSeries) -> Result<Box<dyn FittedModel>, ForecastError>;
}

/// A model fitted to one series.
pub trait FittedModel {
    /// Predicts the next `horizon` periods after the fitted series.
    fn predict(&self, horizon: usize) -> Vec<Prediction>;
}

/// Placeholder for a backend that is compiled out or disabled.
///
/// Keeps the method in the fallback order so requests for it degrade to
/// the next backend instead of failing outright.
pub struct UnavailableBackend {
    method: ForecastMethod,
    reason: String,
}

impl UnavailableBackend {
    /// Creates a placeholder for `method`.
    #[must_use]
    pub fn new(method: ForecastMethod, reason: impl Into<String>) -> Self {
        Self {
            method,
            reason: reason.into(),
        }
    }
}

impl ForecastBackend for UnavailableBackend {
    fn method(&self) -> ForecastMethod {
        self.method
    }

    fn is_available(&self) -> bool {
        false
    }

    fn fit(&self, _series: &RegularSeries) -> Result<Box<dyn FittedModel>, ForecastError> {
        Err(ForecastError::BackendUnavailable {
            method: self.method,
            reason: self.reason.clone(),
        })
    }
}

/// Flat forecast at the last observed value with zero-width bounds.
///
/// Used by every backend when the series is too short to fit.
pub struct PersistenceModel {
    last: f64,
}

impl PersistenceModel {
    /// Creates a model repeating the last value of `series` (or `0.0` for
    /// an empty series).
    #[must_use]
    pub fn new(series: &RegularSeries) -> Self {
        Self {
            last: series.values.last().copied().unwrap_or(0.0),
        }
    }
}

impl FittedModel for PersistenceModel {
    fn predict(&self, horizon: usize) -> Vec<Prediction> {
        vec![Prediction::with_interval(self.last, 0.0); horizon]
    }
}
