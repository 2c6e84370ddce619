//! ARIMA(p, d, 0) with automatic order selection.
//!
//! The differencing order is chosen by comparing the variance of the series
//! with that of its first differences. The AR order is the one with the
//! lowest AIC, fitted on a common sample so scores are comparable.

use share2care_forecast_models::ForecastMethod;

use crate::ForecastError;
use crate::autoregressive::{ArFit, ArModel};
use crate::backend::{FittedModel, ForecastBackend, PersistenceModel};
use crate::linalg::variance;
use crate::series::RegularSeries;

/// Shortest series an ARIMA model is fitted to.
const MIN_POINTS: usize = 3;

/// Automatically ordered ARIMA backend.
pub struct AutoArimaBackend {
    max_p: usize,
    max_d: usize,
}

impl AutoArimaBackend {
    /// Creates a backend searching AR orders `0..=max_p` and differencing
    /// orders up to `max_d` (capped at 1).
    #[must_use]
    pub const fn new(max_p: usize, max_d: usize) -> Self {
        Self { max_p, max_d }
    }

    fn choose_differencing(&self, values: &[f64]) -> usize {
        if self.max_d == 0 || values.len() < MIN_POINTS + 1 {
            return 0;
        }
        let diffs = difference(values);
        usize::from(variance(&diffs) < variance(values))
    }
}

/// First differences of `values`.
#[must_use]
pub fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Fits every order in `0..=max_p` the data supports and keeps the one with
/// the lowest AIC.
#[must_use]
pub fn select_order(values: &[f64], max_p: usize) -> Option<ArFit> {
    let p_max = max_p.min(values.len().saturating_sub(2) / 2);
    (0..=p_max)
        .filter_map(|p| ArFit::fit(values, p, p_max))
        .min_by(|a, b| a.aic.total_cmp(&b.aic))
}

impl ForecastBackend for AutoArimaBackend {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::AutoArima
    }

    fn is_available(&self) -> bool {
        true
    }

    fn fit(&self, series: &RegularSeries) -> Result<Box<dyn FittedModel>, ForecastError> {
        if series.len() < MIN_POINTS {
            return Ok(Box::new(PersistenceModel::new(series)));
        }

        let d = self.choose_differencing(&series.values);
        let working = if d == 1 {
            difference(&series.values)
        } else {
            series.values.clone()
        };

        let fit = select_order(&working, self.max_p).ok_or_else(|| ForecastError::Fit {
            method: self.method(),
            message: format!("no ARIMA order fits a series of {} points", series.len()),
        })?;
        log::debug!(
            "ARIMA({}, {d}, 0) selected: aic={:.3} sigma2={:.4}",
            fit.phi.len(),
            fit.aic,
            fit.sigma2
        );

        Ok(match (d, series.values.last()) {
            (1, Some(last)) => Box::new(ArModel::on_differences(fit, &working, *last)),
            _ => Box::new(ArModel::on_levels(fit, &working)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use share2care_forecast_models::Frequency;

    fn series(values: Vec<f64>) -> RegularSeries {
        RegularSeries {
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            frequency: Frequency::Daily,
            values,
        }
    }

    #[test]
    fn differences_trending_series() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + 2.0 * f64::from(i)).collect();
        let backend = AutoArimaBackend::new(3, 1);
        assert_eq!(backend.choose_differencing(&values), 1);
    }

    #[test]
    fn no_differencing_when_disabled() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + 2.0 * f64::from(i)).collect();
        assert_eq!(AutoArimaBackend::new(3, 0).choose_differencing(&values), 0);
    }

    #[test]
    fn extrapolates_linear_trend() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + 2.0 * f64::from(i)).collect();
        let model = AutoArimaBackend::new(3, 1).fit(&series(values)).unwrap();
        let predictions = model.predict(3);
        assert!((predictions[0].value - 140.0).abs() < 1e-6);
        assert!((predictions[2].value - 144.0).abs() < 1e-6);
    }

    #[test]
    fn prefers_lower_aic() {
        let values: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 10.0 } else { 20.0 } + f64::from(i % 3) * 0.1)
            .collect();
        let fit = select_order(&values, 4).unwrap();
        assert!(!fit.phi.is_empty(), "alternating series needs an AR term");
    }

    #[test]
    fn short_series_persists() {
        let model = AutoArimaBackend::new(3, 1)
            .fit(&series(vec![3.0, 4.0]))
            .unwrap();
        let predictions = model.predict(2);
        assert!(predictions.iter().all(|p| (p.value - 4.0).abs() < f64::EPSILON));
    }
}
