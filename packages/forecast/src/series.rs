//! Regularization of irregular price observations onto a frequency grid.
//!
//! The grid ends on the last observed date and steps backwards from it, so
//! the first forecast period is exactly one unit after the last
//! observation. Each observation lands on the earliest grid date not before
//! it (mean of same-bucket prices). Empty buckets are linearly
//! interpolated, so the series has no gaps.

use chrono::NaiveDate;
use share2care_forecast_models::{ForecastPoint, Frequency, PriceObservation};

use crate::ForecastError;

/// Longest series (in periods) accepted for regularization.
const MAX_PERIODS: u32 = 200_000;

/// A gap-free series on a regular date grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularSeries {
    /// Date of the last period (the last observed date).
    pub end: NaiveDate,
    /// Grid frequency.
    pub frequency: Frequency,
    /// One value per period, oldest first, ending at `end`.
    pub values: Vec<f64>,
}

impl RegularSeries {
    /// Builds a series from observations.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Series`] if there are no observations or the
    /// date span is too long to represent.
    pub fn from_observations(
        observations: &[PriceObservation],
        frequency: Frequency,
    ) -> Result<Self, ForecastError> {
        let end = observations
            .iter()
            .map(|o| o.date)
            .max()
            .ok_or_else(|| ForecastError::Series {
                message: "cannot build a series from zero observations".to_string(),
            })?;

        // Indexed by steps back from `end`.
        let mut sums: Vec<f64> = Vec::new();
        let mut counts: Vec<u32> = Vec::new();

        for obs in observations {
            let back = frequency
                .periods_before(end, obs.date)
                .filter(|i| *i < MAX_PERIODS)
                .ok_or_else(|| ForecastError::Series {
                    message: format!(
                        "observation on {} is out of range for a {frequency} series ending {end}",
                        obs.date
                    ),
                })? as usize;

            if back >= sums.len() {
                sums.resize(back + 1, 0.0);
                counts.resize(back + 1, 0);
            }
            sums[back] += obs.price;
            counts[back] += 1;
        }

        let buckets: Vec<Option<f64>> = sums
            .iter()
            .zip(&counts)
            .rev()
            .map(|(sum, count)| (*count > 0).then(|| sum / f64::from(*count)))
            .collect();

        Ok(Self {
            end,
            frequency,
            values: interpolate(&buckets),
        })
    }

    /// Number of periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Date of period `index`.
    #[must_use]
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        let back = self.len().checked_sub(1)?.checked_sub(index)?;
        self.frequency.nth_before(self.end, u32::try_from(back).ok()?)
    }

    /// The `horizon` dates following the last period, contiguous.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Series`] if a date overflows the calendar.
    pub fn future_dates(&self, horizon: usize) -> Result<Vec<NaiveDate>, ForecastError> {
        (1..=horizon)
            .map(|step| {
                u32::try_from(step)
                    .ok()
                    .and_then(|step| self.frequency.nth_after(self.end, step))
                    .ok_or_else(|| ForecastError::Series {
                        message: format!("forecast period {step} overflows the calendar"),
                    })
            })
            .collect()
    }

    /// Observed history as forecast points without bounds.
    #[must_use]
    pub fn observed_points(&self) -> Vec<ForecastPoint> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, value)| {
                Some(ForecastPoint {
                    date: self.date_at(i)?,
                    predicted_price: *value,
                    lower_bound: None,
                    upper_bound: None,
                })
            })
            .collect()
    }
}

/// Fills interior gaps linearly. The first and last buckets are always
/// populated by construction.
#[allow(clippy::cast_precision_loss)]
fn interpolate(buckets: &[Option<f64>]) -> Vec<f64> {
    let mut values = Vec::with_capacity(buckets.len());
    let mut previous: Option<(usize, f64)> = None;

    for (i, bucket) in buckets.iter().enumerate() {
        let Some(value) = *bucket else {
            continue;
        };
        if let Some((prev_index, prev_value)) = previous {
            let span = (i - prev_index) as f64;
            for gap in prev_index + 1..i {
                let t = (gap - prev_index) as f64 / span;
                values.push((value - prev_value).mul_add(t, prev_value));
            }
        }
        values.push(value);
        previous = Some((i, value));
    }

    values
}
