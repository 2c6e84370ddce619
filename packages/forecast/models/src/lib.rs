#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Price observation and forecast series types.
//!
//! Observations are append-only historical facts from food-price
//! monitoring files. Forecast points are produced fresh on each request
//! and never persisted.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// One market price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Observation date.
    pub date: NaiveDate,
    /// Commodity name as it appears in the source (e.g. "Wheat flour").
    pub commodity: String,
    /// Market name as it appears in the source.
    pub market: String,
    /// Observed price.
    pub price: f64,
}

/// One point of a forecast series.
///
/// Historical points carry the observed value and no bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Period date.
    pub date: NaiveDate,
    /// Predicted (or, for history, observed) price.
    pub predicted_price: f64,
    /// Lower confidence bound.
    pub lower_bound: Option<f64>,
    /// Upper confidence bound.
    pub upper_bound: Option<f64>,
}

/// Sampling frequency of a forecast series.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Frequency {
    /// One period per calendar day.
    #[default]
    #[strum(to_string = "D", serialize = "daily", serialize = "day")]
    Daily,
    /// One period per seven days.
    #[strum(to_string = "W", serialize = "weekly", serialize = "week")]
    Weekly,
    /// One period per calendar month.
    #[strum(to_string = "M", serialize = "MS", serialize = "monthly", serialize = "month")]
    Monthly,
}

impl Frequency {
    /// Date `periods` steps after `anchor`.
    ///
    /// Monthly steps are always taken from the anchor, so a series anchored
    /// on the 31st does not drift after passing a short month.
    #[must_use]
    pub fn nth_after(self, anchor: NaiveDate, periods: u32) -> Option<NaiveDate> {
        match self {
            Self::Daily => anchor.checked_add_days(chrono::Days::new(u64::from(periods))),
            Self::Weekly => {
                anchor.checked_add_days(chrono::Days::new(u64::from(periods) * 7))
            }
            Self::Monthly => anchor.checked_add_months(Months::new(periods)),
        }
    }

    /// Date `periods` steps before `end`.
    #[must_use]
    pub fn nth_before(self, end: NaiveDate, periods: u32) -> Option<NaiveDate> {
        match self {
            Self::Daily => end.checked_sub_days(chrono::Days::new(u64::from(periods))),
            Self::Weekly => end.checked_sub_days(chrono::Days::new(u64::from(periods) * 7)),
            Self::Monthly => end.checked_sub_months(Months::new(periods)),
        }
    }

    /// Number of steps back from `end` to the grid point holding `date`
    /// (the earliest grid point not before `date`). `None` when `date` is
    /// after `end`.
    #[must_use]
    pub fn periods_before(self, end: NaiveDate, date: NaiveDate) -> Option<u32> {
        if date > end {
            return None;
        }
        let steps = match self {
            Self::Daily => (end - date).num_days(),
            Self::Weekly => (end - date).num_days() / 7,
            Self::Monthly => {
                let months = i64::from(end.year() - date.year()) * 12
                    + i64::from(end.month())
                    - i64::from(date.month());
                let months = u32::try_from(months).ok()?;
                if self.nth_before(end, months)? < date {
                    i64::from(months) - 1
                } else {
                    i64::from(months)
                }
            }
        };
        u32::try_from(steps).ok()
    }

    /// Season length used by seasonal models (weekly cycle for daily data,
    /// yearly cycle otherwise).
    #[must_use]
    pub const fn season_length(self) -> usize {
        match self {
            Self::Daily => 7,
            Self::Weekly => 52,
            Self::Monthly => 12,
        }
    }
}

/// Requested forecasting method.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum ForecastMethod {
    /// Additive trend + seasonality model.
    #[strum(to_string = "seasonal", serialize = "prophet")]
    Seasonal,
    /// Automatically ordered ARIMA.
    #[strum(to_string = "auto_arima", serialize = "arima")]
    AutoArima,
    /// Fixed-order autoregressive model.
    #[strum(to_string = "autoregressive", serialize = "ar")]
    Autoregressive,
}

/// A complete forecast response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceForecast {
    /// Backend that produced the forecast.
    pub method: ForecastMethod,
    /// Frequency of the series.
    pub frequency: Frequency,
    /// Filtered observations the forecast was fitted on, ascending by date.
    pub history: Vec<PriceObservation>,
    /// Observed history (regularized to the frequency) followed by the
    /// forecast horizon.
    pub points: Vec<ForecastPoint>,
    /// Number of leading entries of `points` that are history.
    pub observed_points: usize,
}

impl PriceForecast {
    /// Historical part of the series.
    #[must_use]
    pub fn observed(&self) -> &[ForecastPoint] {
        &self.points[..self.observed_points.min(self.points.len())]
    }

    /// Future part of the series.
    #[must_use]
    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.observed_points.min(self.points.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_frequency_aliases() {
        assert_eq!(Frequency::from_str("D").unwrap(), Frequency::Daily);
        assert_eq!(Frequency::from_str("d").unwrap(), Frequency::Daily);
        assert_eq!(Frequency::from_str("weekly").unwrap(), Frequency::Weekly);
        assert_eq!(Frequency::from_str("MS").unwrap(), Frequency::Monthly);
        assert_eq!(Frequency::Monthly.to_string(), "M");
        assert!(Frequency::from_str("fortnightly").is_err());
    }

    #[test]
    fn parses_method_aliases() {
        assert_eq!(
            ForecastMethod::from_str("prophet").unwrap(),
            ForecastMethod::Seasonal
        );
        assert_eq!(
            ForecastMethod::from_str("ARIMA").unwrap(),
            ForecastMethod::AutoArima
        );
        assert_eq!(
            ForecastMethod::from_str("ar").unwrap(),
            ForecastMethod::Autoregressive
        );
        assert_eq!(ForecastMethod::AutoArima.to_string(), "auto_arima");
    }

    #[test]
    fn monthly_steps_do_not_drift() {
        let anchor = date("2024-01-31");
        assert_eq!(Frequency::Monthly.nth_after(anchor, 1), Some(date("2024-02-29")));
        assert_eq!(Frequency::Monthly.nth_after(anchor, 2), Some(date("2024-03-31")));
    }

    #[test]
    fn periods_before_rounds_up_to_grid() {
        let end = date("2024-03-15");
        assert_eq!(Frequency::Daily.periods_before(end, date("2024-03-10")), Some(5));
        assert_eq!(Frequency::Weekly.periods_before(end, date("2024-03-02")), Some(1));
        assert_eq!(Frequency::Monthly.periods_before(end, date("2024-01-16")), Some(1));
        assert_eq!(Frequency::Monthly.periods_before(end, date("2024-01-15")), Some(2));
        assert_eq!(Frequency::Daily.periods_before(end, date("2024-03-16")), None);
    }

    #[test]
    fn month_end_grid_steps_back_through_short_months() {
        let end = date("2024-03-31");
        assert_eq!(Frequency::Monthly.nth_before(end, 1), Some(date("2024-02-29")));
        assert_eq!(Frequency::Monthly.periods_before(end, date("2024-02-29")), Some(1));
        assert_eq!(Frequency::Monthly.periods_before(end, date("2024-02-15")), Some(1));
    }

    #[test]
    fn splits_observed_and_future() {
        let point = |d: &str| ForecastPoint {
            date: date(d),
            predicted_price: 1.0,
            lower_bound: None,
            upper_bound: None,
        };
        let forecast = PriceForecast {
            method: ForecastMethod::Autoregressive,
            frequency: Frequency::Daily,
            history: vec![],
            points: vec![point("2024-01-01"), point("2024-01-02"), point("2024-01-03")],
            observed_points: 2,
        };
        assert_eq!(forecast.observed().len(), 2);
        assert_eq!(forecast.future().len(), 1);
        assert_eq!(forecast.future()[0].date, date("2024-01-03"));
    }

    #[test]
    fn serializes_method_snake_case() {
        let json = serde_json::to_string(&ForecastMethod::AutoArima).unwrap();
        assert_eq!(json, "\"auto_arima\"");
    }
}
