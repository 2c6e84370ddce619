//! Least-squares autoregressive models.
//!
//! [`ArFit`] is shared with the ARIMA backend, which fits it on the
//! differenced series.

use share2care_forecast_models::ForecastMethod;

use crate::ForecastError;
use crate::backend::{FittedModel, ForecastBackend, PersistenceModel, Prediction};
use crate::linalg::{Z_95, integrate_ar, least_squares, psi_weights};
use crate::series::RegularSeries;

/// Floor applied to the residual variance inside the log-likelihood.
const MIN_VARIANCE: f64 = 1e-12;

/// Coefficients of an AR(p) model with intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct ArFit {
    /// Constant term.
    pub intercept: f64,
    /// Lag coefficients, `phi[0]` multiplies `y(t-1)`.
    pub phi: Vec<f64>,
    /// Residual variance (degrees-of-freedom corrected).
    pub sigma2: f64,
    /// Akaike information criterion on the fitted sample.
    pub aic: f64,
}

impl ArFit {
    /// Fits AR(`order`) to `values` using targets `values[start..]`.
    ///
    /// `start` must be at least `order`. Using a common `start` makes AIC
    /// comparable across orders. Returns `None` if there are too few
    /// observations or the regression is singular.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(values: &[f64], order: usize, start: usize) -> Option<Self> {
        if start < order || start >= values.len() {
            return None;
        }
        let targets = &values[start..];
        let n_obs = targets.len();
        let params = order + 1;
        if order > 0 && n_obs <= params {
            return None;
        }

        let (intercept, phi) = if order == 0 {
            (crate::linalg::mean(targets), Vec::new())
        } else {
            let design: Vec<Vec<f64>> = (start..values.len())
                .map(|t| {
                    std::iter::once(1.0)
                        .chain((1..=order).map(|lag| values[t - lag]))
                        .collect()
                })
                .collect();
            let beta = least_squares(&design, targets)?;
            (beta[0], beta[1..].to_vec())
        };

        let rss: f64 = (start..values.len())
            .map(|t| {
                let fitted = intercept
                    + phi
                        .iter()
                        .enumerate()
                        .map(|(i, p)| p * values[t - i - 1])
                        .sum::<f64>();
                (values[t] - fitted).powi(2)
            })
            .sum();

        let n = n_obs as f64;
        let aic = n.mul_add((rss / n).max(MIN_VARIANCE).ln(), 2.0 * (order as f64 + 2.0));
        let sigma2 = rss / n_obs.saturating_sub(params).max(1) as f64;

        Some(Self {
            intercept,
            phi,
            sigma2,
            aic,
        })
    }

    /// Fits the highest order up to `max_order` the data supports, stepping
    /// down when the regression is singular.
    #[must_use]
    pub fn fit_largest(values: &[f64], max_order: usize) -> Option<Self> {
        let supported = values.len().saturating_sub(2) / 2;
        (0..=max_order.min(supported))
            .rev()
            .find_map(|order| Self::fit(values, order, order))
    }
}

/// A fitted AR model on levels or first differences.
pub struct ArModel {
    fit: ArFit,
    /// Series the AR recursion runs on (levels, or differences).
    working: Vec<f64>,
    /// Last observed level when `working` holds differences.
    integrate_from: Option<f64>,
}

impl ArModel {
    /// Model on levels.
    #[must_use]
    pub fn on_levels(fit: ArFit, values: &[f64]) -> Self {
        Self {
            fit,
            working: values.to_vec(),
            integrate_from: None,
        }
    }

    /// Model on first differences, integrated back from `last_level`.
    #[must_use]
    pub fn on_differences(fit: ArFit, differences: &[f64], last_level: f64) -> Self {
        Self {
            fit,
            working: differences.to_vec(),
            integrate_from: Some(last_level),
        }
    }
}

impl FittedModel for ArModel {
    fn predict(&self, horizon: usize) -> Vec<Prediction> {
        let mut working = self.working.clone();
        let mut level = self.integrate_from;

        let ar = if self.integrate_from.is_some() {
            integrate_ar(&self.fit.phi)
        } else {
            self.fit.phi.clone()
        };
        let psi = psi_weights(&ar, horizon);

        let mut variance = 0.0;
        let mut out = Vec::with_capacity(horizon);

        for (h, weight) in psi.iter().enumerate() {
            let n = working.len();
            let next = self.fit.intercept
                + self
                    .fit
                    .phi
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i < n)
                    .map(|(i, p)| p * working[n - i - 1])
                    .sum::<f64>();
            working.push(next);

            let value = match level.as_mut() {
                Some(level) => {
                    *level += next;
                    *level
                }
                None => next,
            };

            variance += self.fit.sigma2 * weight.powi(2);
            log::trace!("h={} value={value} variance={variance}", h + 1);
            out.push(Prediction::with_interval(value, Z_95 * variance.sqrt()));
        }

        out
    }
}

/// Fixed-order AR(p) on levels.
pub struct AutoregressiveBackend {
    order: usize,
}

impl AutoregressiveBackend {
    /// Creates a backend of AR order `order`.
    #[must_use]
    pub const fn new(order: usize) -> Self {
        Self { order }
    }
}

impl ForecastBackend for AutoregressiveBackend {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::Autoregressive
    }

    fn is_available(&self) -> bool {
        true
    }

    fn fit(&self, series: &RegularSeries) -> Result<Box<dyn FittedModel>, ForecastError> {
        if series.len() < 2 {
            return Ok(Box::new(PersistenceModel::new(series)));
        }

        let fit = ArFit::fit_largest(&series.values, self.order).ok_or_else(|| {
            ForecastError::Fit {
                method: self.method(),
                message: format!("no AR order fits a series of {} points", series.len()),
            }
        })?;
        log::debug!(
            "AR fit: order={} intercept={:.4} sigma2={:.4}",
            fit.phi.len(),
            fit.intercept,
            fit.sigma2
        );

        Ok(Box::new(ArModel::on_levels(fit, &series.values)))
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
    fn recovers_ar1_coefficient() {
        let mut values = vec![10.0];
        for i in 1..15 {
            let prev: f64 = values[i - 1];
            values.push(0.6f64.mul_add(prev, 2.0));
        }
        let fit = ArFit::fit(&values, 1, 1).unwrap();
        assert!((fit.phi[0] - 0.6).abs() < 1e-6, "phi = {}", fit.phi[0]);
        assert!((fit.intercept - 2.0).abs() < 1e-6);
    }

    #[test]
    fn order_zero_is_mean() {
        let fit = ArFit::fit(&[1.0, 2.0, 3.0], 0, 0).unwrap();
        assert!((fit.intercept - 2.0).abs() < 1e-12);
        assert!(fit.phi.is_empty());
    }

    #[test]
    fn constant_series_steps_down_to_mean() {
        let fit = ArFit::fit_largest(&[5.0; 10], 2).unwrap();
        assert!(fit.phi.is_empty());
        assert!((fit.intercept - 5.0).abs() < 1e-12);
        assert!(fit.sigma2.abs() < 1e-12);
    }

    #[test]
    fn bounds_widen_with_horizon() {
        let values: Vec<f64> = (0..30)
            .map(|i| 10.0 + f64::from(i % 5) - f64::from(i % 3))
            .collect();
        let model = AutoregressiveBackend::new(2).fit(&series(values)).unwrap();
        let predictions = model.predict(5);
        assert_eq!(predictions.len(), 5);

        let widths: Vec<f64> = predictions
            .iter()
            .map(|p| p.upper.unwrap() - p.lower.unwrap())
            .collect();
        for window in widths.windows(2) {
            assert!(window[1] >= window[0] - 1e-9);
        }
        for p in &predictions {
            assert!(p.lower.unwrap() <= p.value && p.value <= p.upper.unwrap());
        }
    }

    #[test]
    fn single_point_persists() {
        let model = AutoregressiveBackend::new(2).fit(&series(vec![42.0])).unwrap();
        let predictions = model.predict(3);
        assert!(predictions.iter().all(|p| (p.value - 42.0).abs() < f64::EPSILON));
        assert!(predictions.iter().all(|p| p.lower == p.upper));
    }
}
