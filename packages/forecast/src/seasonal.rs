//! Additive Holt-Winters (level + trend + seasonality).
//!
//! Smoothing parameters are chosen by grid search on the one-step-ahead
//! squared error. With fewer than two full seasons the seasonal component
//! is dropped and Holt's linear trend method is used instead.

use share2care_forecast_models::ForecastMethod;

use crate::ForecastError;
use crate::backend::{FittedModel, ForecastBackend, PersistenceModel, Prediction};
use crate::linalg::{Z_95, mean};
use crate::series::RegularSeries;

/// Smoothing weights for level, trend and season.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Smoothing {
    alpha: f64,
    beta: f64,
    gamma: f64,
}

/// Final filter state after a pass over the series.
#[derive(Debug, Clone)]
struct FilterState {
    level: f64,
    trend: f64,
    season: Vec<f64>,
    sse: f64,
    steps: usize,
}

/// Seasonal forecasting backend.
pub struct SeasonalBackend {
    grid: Vec<f64>,
}

impl SeasonalBackend {
    /// Creates a backend searching smoothing weights `k / grid_steps` for
    /// `k` in `1..grid_steps`.
    #[must_use]
    pub fn new(grid_steps: u32) -> Self {
        let grid = if grid_steps < 2 {
            vec![0.5]
        } else {
            (1..grid_steps)
                .map(|k| f64::from(k) / f64::from(grid_steps))
                .collect()
        };
        Self { grid }
    }

    fn search(&self, mut run: impl FnMut(Smoothing) -> FilterState, seasonal: bool) -> FilterState {
        let gammas: &[f64] = if seasonal { &self.grid } else { &[0.0] };
        let mut best: Option<(Smoothing, FilterState)> = None;

        for &alpha in &self.grid {
            for &beta in &self.grid {
                for &gamma in gammas {
                    let params = Smoothing { alpha, beta, gamma };
                    let state = run(params);
                    if best.as_ref().is_none_or(|(_, b)| state.sse < b.sse) {
                        best = Some((params, state));
                    }
                }
            }
        }

        let (params, state) = best.unwrap_or_else(|| {
            let params = Smoothing {
                alpha: 0.5,
                beta: 0.5,
                gamma: 0.0,
            };
            (params, run(params))
        });
        log::debug!(
            "Seasonal smoothing: alpha={} beta={} gamma={} sse={:.4}",
            params.alpha,
            params.beta,
            params.gamma,
            state.sse
        );
        state
    }
}

/// Additive Holt-Winters filter with season length `m`.
///
/// The level starts at the mean of the first season, the trend at the
/// per-period change between the first two season means, and seasonal
/// indices at the first season's deviations from the level.
#[allow(clippy::cast_precision_loss)]
fn holt_winters(values: &[f64], m: usize, p: Smoothing) -> FilterState {
    let first = mean(&values[..m]);
    let second = mean(&values[m..2 * m]);
    let mut season: Vec<f64> = values[..m].iter().map(|y| y - first).collect();
    let mut level = first;
    let mut trend = (second - first) / m as f64;
    let mut sse = 0.0;

    for (t, y) in values.iter().enumerate().skip(m) {
        let s = t % m;
        let error = y - (level + trend + season[s]);
        sse += error * error;

        let new_level = p.alpha.mul_add(y - season[s], (1.0 - p.alpha) * (level + trend));
        trend = p.beta.mul_add(new_level - level, (1.0 - p.beta) * trend);
        season[s] = p.gamma.mul_add(y - new_level, (1.0 - p.gamma) * season[s]);
        level = new_level;
    }

    FilterState {
        level,
        trend,
        season,
        sse,
        steps: values.len() - m,
    }
}

/// Holt's linear trend filter.
fn holt_linear(values: &[f64], p: Smoothing) -> FilterState {
    let mut level = values[0];
    let mut trend = values[1] - values[0];
    let mut sse = 0.0;

    for y in &values[1..] {
        let error = y - (level + trend);
        sse += error * error;

        let new_level = p.alpha.mul_add(*y, (1.0 - p.alpha) * (level + trend));
        trend = p.beta.mul_add(new_level - level, (1.0 - p.beta) * trend);
        level = new_level;
    }

    FilterState {
        level,
        trend,
        season: Vec::new(),
        sse,
        steps: values.len() - 1,
    }
}

/// Fitted seasonal model.
struct SeasonalModel {
    state: FilterState,
    /// Index of the first forecast period.
    next: usize,
    sigma2: f64,
}

impl FittedModel for SeasonalModel {
    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, horizon: usize) -> Vec<Prediction> {
        let m = self.state.season.len();
        (1..=horizon)
            .map(|h| {
                let seasonal = if m == 0 {
                    0.0
                } else {
                    self.state.season[(self.next + h - 1) % m]
                };
                let value = (h as f64).mul_add(self.state.trend, self.state.level) + seasonal;
                Prediction::with_interval(value, Z_95 * (self.sigma2 * h as f64).sqrt())
            })
            .collect()
    }
}

impl ForecastBackend for SeasonalBackend {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::Seasonal
    }

    fn is_available(&self) -> bool {
        true
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&self, series: &RegularSeries) -> Result<Box<dyn FittedModel>, ForecastError> {
        let values = &series.values;
        if values.len() < 2 {
            return Ok(Box::new(PersistenceModel::new(series)));
        }

        let m = series.frequency.season_length();
        let state = if m >= 2 && values.len() >= 2 * m {
            self.search(|p| holt_winters(values, m, p), true)
        } else {
            log::debug!(
                "{} points is under two seasons of {m}; fitting trend only",
                values.len()
            );
            self.search(|p| holt_linear(values, p), false)
        };

        let sigma2 = state.sse / state.steps.max(1) as f64;
        if !sigma2.is_finite() {
            return Err(ForecastError::Fit {
                method: self.method(),
                message: "residual variance is not finite".to_string(),
            });
        }

        Ok(Box::new(SeasonalModel {
            state,
            next: values.len(),
            sigma2,
        }))
    }
}
