//! Daily demand series preparation.
//!
//! Sales arrive as irregular transactions: several rows per day, and days with
//! no rows at all. Models need a regular daily calendar, so observations are
//! summed per day and the gaps between the first and last sale are filled
//! with zero demand.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::ForecastError;

/// A single recorded sale quantity for one SKU on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub product_id: String,
    pub date: NaiveDate,
    pub quantity: f64,
}

impl Observation {
    pub fn new(product_id: impl Into<String>, date: NaiveDate, quantity: f64) -> Self {
        Self {
            product_id: product_id.into(),
            date,
            quantity,
        }
    }
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days`-long window that ends on (and includes) `end`.
    pub fn ending_at(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end - Duration::days(span),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Gap-free daily demand for one product.
///
/// Stored as a start date plus one value per consecutive day, so dates are
/// unique and strictly increasing by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    product_id: String,
    start: NaiveDate,
    values: Vec<f64>,
}

impl Series {
    /// Build a series from already-regular daily values.
    pub fn from_daily_values(
        product_id: impl Into<String>,
        start: NaiveDate,
        values: Vec<f64>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            start,
            values,
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last calendar day covered. Equals `start` for an empty series.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.values.len().saturating_sub(1) as i64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        self.start + Duration::days(index as i64)
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        let offset = (date - self.start).num_days();
        if offset < 0 {
            return None;
        }
        self.values.get(offset as usize).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (self.date_at(i), *v))
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn is_all_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

/// Filter `observations` to `product_id`, sum same-day quantities and fill
/// every missing day between the first and last sale with zero.
pub fn prepare_series(
    observations: &[Observation],
    product_id: &str,
) -> Result<Series, ForecastError> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for obs in observations.iter().filter(|o| o.product_id == product_id) {
        if !obs.quantity.is_finite() || obs.quantity < 0.0 {
            return Err(ForecastError::InvalidObservation {
                product_id: obs.product_id.clone(),
                date: obs.date,
                reason: format!("quantity must be a non-negative number, got {}", obs.quantity),
            });
        }
        *daily.entry(obs.date).or_insert(0.0) += obs.quantity;
    }

    let (first, last) = match (daily.keys().next(), daily.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(ForecastError::EmptySeries {
                product_id: product_id.to_string(),
            })
        }
    };

    let span = (last - first).num_days() as usize + 1;
    let mut values = vec![0.0; span];
    for (date, quantity) in daily {
        values[(date - first).num_days() as usize] = quantity;
    }

    Ok(Series::from_daily_values(product_id, first, values))
}
