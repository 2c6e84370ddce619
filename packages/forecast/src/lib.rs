#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Commodity price forecasting.
//!
//! Filters price observations by commodity and market, regularizes them
//! onto a frequency grid and delegates to one of several interchangeable
//! backends. The requested backend is tried first; when it is unavailable
//! the remaining backends are tried in registry priority order.

#[cfg(feature = "auto-arima")]
pub mod arima;
pub mod autoregressive;
pub mod backend;
pub mod linalg;
pub mod registry;
#[cfg(feature = "seasonal")]
pub mod seasonal;
pub mod series;

use std::sync::LazyLock;

use share2care_forecast_models::{
    ForecastMethod, ForecastPoint, Frequency, PriceForecast, PriceObservation,
};
use thiserror::Error;

use crate::backend::ForecastBackend;
use crate::series::RegularSeries;

/// Default number of future periods.
pub const DEFAULT_PERIODS: usize = 30;

/// Largest accepted forecast horizon, in periods.
pub const MAX_HORIZON: usize = 10_000;

/// Errors that can occur while forecasting.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// No observations remain after applying the filters.
    #[error(
        "No data after filtering (commodity: {}, market: {}). Check commodity/market names.",
        .commodity.as_deref().unwrap_or("any"),
        .market.as_deref().unwrap_or("any")
    )]
    EmptyResult {
        /// Commodity filter that was applied.
        commodity: Option<String>,
        /// Market filter that was applied.
        market: Option<String>,
    },

    /// A backend is compiled out or disabled.
    #[error("Forecast backend '{method}' is unavailable: {reason}")]
    BackendUnavailable {
        /// Method of the unavailable backend.
        method: ForecastMethod,
        /// Why it cannot run.
        reason: String,
    },

    /// Every backend in the fallback order was unavailable.
    #[error("No forecast backend available (tried: {})", .tried.join(", "))]
    NoBackendAvailable {
        /// Backends that were tried, in order.
        tried: Vec<String>,
    },

    /// The observations could not be turned into a regular series.
    #[error("Series error: {message}")]
    Series {
        /// Description of what went wrong.
        message: String,
    },

    /// A backend failed to fit the series.
    #[error("Forecast backend '{method}' failed: {message}")]
    Fit {
        /// Method of the failing backend.
        method: ForecastMethod,
        /// Description of what went wrong.
        message: String,
    },
}

/// Parameters of one forecast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRequest {
    /// Case-insensitive exact commodity filter.
    pub commodity: Option<String>,
    /// Case-insensitive exact market filter.
    pub market: Option<String>,
    /// Number of future periods.
    pub periods: usize,
    /// Series frequency.
    pub frequency: Frequency,
    /// Preferred backend.
    pub method: ForecastMethod,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        Self {
            commodity: None,
            market: None,
            periods: DEFAULT_PERIODS,
            frequency: Frequency::default(),
            method: ForecastMethod::Seasonal,
        }
    }
}

fn matches_filter(value: &str, filter: Option<&str>) -> bool {
    match filter.filter(|f| !f.is_empty()) {
        Some(f) => value.to_lowercase() == f.to_lowercase(),
        None => true,
    }
}

/// Observations matching both filters, sorted ascending by date.
///
/// Empty filters match everything.
#[must_use]
pub fn filter_observations(
    observations: &[PriceObservation],
    commodity: Option<&str>,
    market: Option<&str>,
) -> Vec<PriceObservation> {
    let mut filtered: Vec<PriceObservation> = observations
        .iter()
        .filter(|o| matches_filter(&o.commodity, commodity) && matches_filter(&o.market, market))
        .cloned()
        .collect();
    filtered.sort_by_key(|o| o.date);
    filtered
}

/// A set of backends in fallback priority order.
pub struct Forecaster {
    backends: Vec<Box<dyn ForecastBackend>>,
}

impl Forecaster {
    /// Creates a forecaster from backends already in priority order.
    #[must_use]
    pub fn new(backends: Vec<Box<dyn ForecastBackend>>) -> Self {
        Self { backends }
    }

    /// Creates a forecaster from the embedded backend registry.
    #[must_use]
    pub fn from_registry() -> Self {
        Self::new(registry::build_backends())
    }

    /// Registered backends in priority order.
    #[must_use]
    pub fn backends(&self) -> &[Box<dyn ForecastBackend>] {
        &self.backends
    }

    /// Backends to try for `method`: that backend first, then the rest in
    /// priority order.
    #[must_use]
    pub fn fallback_order(&self, method: ForecastMethod) -> Vec<&dyn ForecastBackend> {
        let (preferred, rest): (Vec<_>, Vec<_>) = self
            .backends
            .iter()
            .map(|b| &**b)
            .partition(|b| b.method() == method);
        preferred.into_iter().chain(rest).collect()
    }

    /// Forecasts the filtered observations.
    ///
    /// The result holds the regularized history (null bounds) followed by
    /// `request.periods` future points.
    ///
    /// # Errors
    ///
    /// * [`ForecastError::Series`] if `request.periods` exceeds [`MAX_HORIZON`]
    /// * [`ForecastError::EmptyResult`] if no observation matches the filters
    /// * [`ForecastError::NoBackendAvailable`] if every backend is unavailable
    /// * [`ForecastError::Fit`] if an available backend fails to fit
    pub fn forecast(
        &self,
        observations: &[PriceObservation],
        request: &ForecastRequest,
    ) -> Result<PriceForecast, ForecastError> {
        if request.periods > MAX_HORIZON {
            return Err(ForecastError::Series {
                message: format!(
                    "horizon of {} periods exceeds the maximum of {MAX_HORIZON}",
                    request.periods
                ),
            });
        }

        let history = filter_observations(
            observations,
            request.commodity.as_deref(),
            request.market.as_deref(),
        );
        if history.is_empty() {
            return Err(ForecastError::EmptyResult {
                commodity: request.commodity.clone(),
                market: request.market.clone(),
            });
        }

        let series = RegularSeries::from_observations(&history, request.frequency)?;
        log::info!(
            "Forecasting {} periods from {} observations ({} {} periods)",
            request.periods,
            history.len(),
            series.len(),
            request.frequency
        );

        let mut tried = Vec::new();
        for backend in self.fallback_order(request.method) {
            let method = backend.method();
            tried.push(method.to_string());

            if !backend.is_available() {
                log::warn!("Forecast backend '{method}' unavailable, trying next");
                continue;
            }

            let model = match backend.fit(&series) {
                Ok(model) => model,
                Err(ForecastError::BackendUnavailable { reason, .. }) => {
                    log::warn!("Forecast backend '{method}' unavailable ({reason}), trying next");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let dates = series.future_dates(request.periods)?;
            let predictions = model.predict(request.periods);

            let mut points = series.observed_points();
            let observed_points = points.len();
            points.extend(dates.into_iter().zip(predictions).map(|(date, p)| {
                ForecastPoint {
                    date,
                    predicted_price: p.value,
                    lower_bound: p.lower,
                    upper_bound: p.upper,
                }
            }));

            if method != request.method {
                log::info!("Forecast produced by fallback backend '{method}'");
            }

            return Ok(PriceForecast {
                method,
                frequency: request.frequency,
                history,
                points,
                observed_points,
            });
        }

        Err(ForecastError::NoBackendAvailable { tried })
    }
}

static DEFAULT_FORECASTER: LazyLock<Forecaster> = LazyLock::new(Forecaster::from_registry);

/// Forecasts with the backends from the embedded registry.
///
/// # Errors
///
/// See [`Forecaster::forecast`].
pub fn forecast_prices(
    observations: &[PriceObservation],
    request: &ForecastRequest,
) -> Result<PriceForecast, ForecastError> {
    DEFAULT_FORECASTER.forecast(observations, request)
}

/// Backends of the default forecaster as `(method, available)` pairs in
/// priority order.
#[must_use]
pub fn backend_availability() -> Vec<(ForecastMethod, bool)> {
    DEFAULT_FORECASTER
        .backends()
        .iter()
        .map(|b| (b.method(), b.is_available()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoregressive::AutoregressiveBackend;
    use crate::backend::{FittedModel, UnavailableBackend};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn obs(d: &str, commodity: &str, market: &str, price: f64) -> PriceObservation {
        PriceObservation {
            date: date(d),
            commodity: commodity.to_string(),
            market: market.to_string(),
            price,
        }
    }

    fn wheat_january() -> Vec<PriceObservation> {
        (1..=30)
            .map(|day| {
                obs(
                    &format!("2024-01-{day:02}"),
                    "Wheat",
                    "Lahore",
                    f64::from(day).mul_add(0.5, 100.0),
                )
            })
            .collect()
    }

    /// Claims availability but reports itself unavailable at fit time.
    struct LateUnavailable;

    impl ForecastBackend for LateUnavailable {
        fn method(&self) -> ForecastMethod {
            ForecastMethod::AutoArima
        }

        fn is_available(&self) -> bool {
            true
        }

        fn fit(&self, _series: &RegularSeries) -> Result<Box<dyn FittedModel>, ForecastError> {
            Err(ForecastError::BackendUnavailable {
                method: ForecastMethod::AutoArima,
                reason: "runtime missing".to_string(),
            })
        }
    }

    struct Failing;

    impl ForecastBackend for Failing {
        fn method(&self) -> ForecastMethod {
            ForecastMethod::Seasonal
        }

        fn is_available(&self) -> bool {
            true
        }

        fn fit(&self, _series: &RegularSeries) -> Result<Box<dyn FittedModel>, ForecastError> {
            Err(ForecastError::Fit {
                method: ForecastMethod::Seasonal,
                message: "boom".to_string(),
            })
        }
    }

    #[test]
    fn filters_case_insensitively_and_sorts() {
        let observations = vec![
            obs("2024-01-03", "Wheat", "Lahore", 3.0),
            obs("2024-01-01", "WHEAT", "lahore", 1.0),
            obs("2024-01-02", "Rice", "Lahore", 2.0),
            obs("2024-01-02", "wheat", "Karachi", 2.0),
        ];
        let filtered = filter_observations(&observations, Some("wheat"), Some("LAHORE"));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].date, date("2024-01-01"));
        assert_eq!(filtered[1].date, date("2024-01-03"));
    }

    #[test]
    fn filter_is_exact_apart_from_case() {
        let observations = vec![
            obs("2024-01-01", "Wheat", "Lahore", 1.0),
            obs("2024-01-02", "Wheat ", "Lahore", 2.0),
            obs("2024-01-03", "Wheat flour", "Lahore", 3.0),
        ];
        let filtered = filter_observations(&observations, Some("WHEAT"), None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].date, date("2024-01-01"));
    }

    #[test]
    fn commodity_case_does_not_change_history() {
        let mut observations = wheat_january();
        observations.push(obs("2024-01-15", "Rice", "Lahore", 60.0));
        let request = |commodity: &str| ForecastRequest {
            commodity: Some(commodity.to_string()),
            periods: 2,
            method: ForecastMethod::Autoregressive,
            ..ForecastRequest::default()
        };

        let upper = forecast_prices(&observations, &request("Wheat")).unwrap();
        let lower = forecast_prices(&observations, &request("wheat")).unwrap();
        assert_eq!(upper.history, lower.history);
        assert_eq!(upper.history.len(), 30);
        assert_eq!(upper.points, lower.points);
    }

    #[test]
    fn weekly_future_follows_off_grid_last_observation() {
        let observations = vec![
            obs("2024-01-01", "Wheat", "Lahore", 100.0),
            obs("2024-01-10", "Wheat", "Lahore", 104.0),
        ];
        let request = ForecastRequest {
            periods: 2,
            frequency: Frequency::Weekly,
            method: ForecastMethod::Autoregressive,
            ..ForecastRequest::default()
        };
        let forecast = forecast_prices(&observations, &request).unwrap();

        let future: Vec<NaiveDate> = forecast.future().iter().map(|p| p.date).collect();
        assert_eq!(future, vec![date("2024-01-17"), date("2024-01-24")]);
        assert_eq!(forecast.observed().last().map(|p| p.date), Some(date("2024-01-10")));
    }

    #[test]
    fn monthly_future_follows_off_grid_last_observation() {
        let observations = vec![
            obs("2024-01-15", "Rice", "Quetta", 80.0),
            obs("2024-03-01", "Rice", "Quetta", 84.0),
        ];
        let request = ForecastRequest {
            periods: 1,
            frequency: Frequency::Monthly,
            method: ForecastMethod::Autoregressive,
            ..ForecastRequest::default()
        };
        let forecast = forecast_prices(&observations, &request).unwrap();

        assert_eq!(forecast.future()[0].date, date("2024-04-01"));
        assert_eq!(forecast.observed().last().map(|p| p.date), Some(date("2024-03-01")));
    }

    #[test]
    fn oversized_horizon_is_series_error() {
        let request = ForecastRequest {
            periods: usize::MAX,
            ..ForecastRequest::default()
        };
        let err = forecast_prices(&wheat_january(), &request).unwrap_err();
        assert!(matches!(err, ForecastError::Series { .. }));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let observations = wheat_january();
        assert_eq!(filter_observations(&observations, Some(""), None).len(), 30);
    }

    #[test]
    fn future_dates_follow_last_observation() {
        let request = ForecastRequest {
            commodity: Some("wheat".to_string()),
            periods: 5,
            method: ForecastMethod::Autoregressive,
            ..ForecastRequest::default()
        };
        let forecast = Forecaster::new(vec![Box::new(AutoregressiveBackend::new(2))])
            .forecast(&wheat_january(), &request)
            .unwrap();

        let future: Vec<NaiveDate> = forecast.future().iter().map(|p| p.date).collect();
        assert_eq!(
            future,
            vec![
                date("2024-01-31"),
                date("2024-02-01"),
                date("2024-02-02"),
                date("2024-02-03"),
                date("2024-02-04"),
            ]
        );
        assert_eq!(forecast.observed_points, 30);
        assert_eq!(forecast.points.len(), 35);
        assert!(
            forecast
                .observed()
                .iter()
                .all(|p| p.lower_bound.is_none() && p.upper_bound.is_none())
        );
        assert!(
            forecast
                .future()
                .iter()
                .all(|p| p.lower_bound.is_some() && p.upper_bound.is_some())
        );
    }

    #[test]
    fn unknown_commodity_is_empty_result() {
        let request = ForecastRequest {
            commodity: Some("Unobtainium".to_string()),
            ..ForecastRequest::default()
        };
        let err = Forecaster::from_registry()
            .forecast(&wheat_january(), &request)
            .unwrap_err();
        assert!(matches!(err, ForecastError::EmptyResult { .. }));
        assert!(err.to_string().contains("Check commodity/market names"));
    }

    #[test]
    fn falls_back_past_unavailable_backends() {
        let forecaster = Forecaster::new(vec![
            Box::new(UnavailableBackend::new(ForecastMethod::Seasonal, "compiled out")),
            Box::new(LateUnavailable),
            Box::new(AutoregressiveBackend::new(2)),
        ]);
        let request = ForecastRequest {
            periods: 3,
            method: ForecastMethod::Seasonal,
            ..ForecastRequest::default()
        };
        let forecast = forecaster.forecast(&wheat_january(), &request).unwrap();
        assert_eq!(forecast.method, ForecastMethod::Autoregressive);
        assert_eq!(forecast.future().len(), 3);
    }

    #[test]
    fn requested_method_goes_first() {
        let forecaster = Forecaster::from_registry();
        let order: Vec<ForecastMethod> = forecaster
            .fallback_order(ForecastMethod::Autoregressive)
            .iter()
            .map(|b| b.method())
            .collect();
        assert_eq!(order[0], ForecastMethod::Autoregressive);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn all_unavailable_reports_tried_backends() {
        let forecaster = Forecaster::new(vec![
            Box::new(UnavailableBackend::new(ForecastMethod::Seasonal, "off")),
            Box::new(LateUnavailable),
        ]);
        let err = forecaster
            .forecast(&wheat_january(), &ForecastRequest::default())
            .unwrap_err();
        match err {
            ForecastError::NoBackendAvailable { tried } => {
                assert_eq!(tried, vec!["seasonal", "auto_arima"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fit_errors_propagate() {
        let forecaster = Forecaster::new(vec![
            Box::new(Failing),
            Box::new(AutoregressiveBackend::new(2)),
        ]);
        let err = forecaster
            .forecast(&wheat_january(), &ForecastRequest::default())
            .unwrap_err();
        assert!(matches!(err, ForecastError::Fit { .. }));
    }

    #[test]
    fn single_observation_forecasts_flat() {
        let observations = vec![obs("2024-03-01", "Rice", "Quetta", 80.0)];
        let request = ForecastRequest {
            periods: 2,
            frequency: Frequency::Monthly,
            ..ForecastRequest::default()
        };
        let forecast = forecast_prices(&observations, &request).unwrap();
        let future = forecast.future();
        assert_eq!(future[0].date, date("2024-04-01"));
        assert_eq!(future[1].date, date("2024-05-01"));
        assert!(future.iter().all(|p| (p.predicted_price - 80.0).abs() < f64::EPSILON));
    }

    #[test]
    fn default_registry_reports_availability() {
        let availability = backend_availability();
        assert_eq!(availability.len(), 3);
        assert!(availability.contains(&(ForecastMethod::Autoregressive, true)));
    }
}
