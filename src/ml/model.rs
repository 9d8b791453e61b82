use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::series::Series;
use crate::errors::ForecastError;

/// ARIMA `(p, d, q)` order.
///
/// Serialized as a three-element array, e.g. `[1, 1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize, usize)", into = "(usize, usize, usize)")]
pub struct ModelOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ModelOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Shortest series this order can be fitted to.
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 1
    }
}

impl Default for ModelOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl From<(usize, usize, usize)> for ModelOrder {
    fn from((p, d, q): (usize, usize, usize)) -> Self {
        Self::new(p, d, q)
    }
}

impl From<ModelOrder> for (usize, usize, usize) {
    fn from(order: ModelOrder) -> Self {
        (order.p, order.d, order.q)
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl FromStr for ModelOrder {
    type Err = String;

    /// Accepts `1,1,1` or `(1,1,1)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!("expected p,d,q but got '{}'", s));
        }
        let parse = |v: &str| {
            v.parse::<usize>()
                .map_err(|_| format!("'{}' is not a non-negative integer", v))
        };
        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

/// Which model family the engine fits.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ModelKind {
    #[default]
    Arima,
    /// Linear trend plus day-of-week seasonality
    Additive,
}

/// Naive method used when the configured model cannot be fitted.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackStrategy {
    LastValue,
    #[default]
    MovingAverage,
}

/// One step of a model forecast, before bounds and flooring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointForecast {
    pub mean: f64,
    pub std_error: f64,
}

/// A forecasting method that can be trained on a daily series.
pub trait DemandModel: fmt::Debug + Send + Sync {
    /// Label stored with every forecast produced by this model.
    fn name(&self) -> String;

    fn min_observations(&self) -> usize;

    fn fit(&self, series: &Series) -> Result<Box<dyn FittedDemandModel>, ForecastError>;
}

/// Trained model state, ready to extrapolate past the end of its series.
pub trait FittedDemandModel: fmt::Debug + Send + Sync {
    fn name(&self) -> String;

    /// `horizon` consecutive daily forecasts starting the day after training ends.
    fn forecast(&self, horizon: usize) -> Vec<PointForecast>;
}

/// Shared length guard for model implementations.
pub(crate) fn ensure_min_observations(
    model: &dyn DemandModel,
    series: &Series,
) -> Result<(), ForecastError> {
    let required = model.min_observations();
    if series.len() < required {
        return Err(ForecastError::InsufficientData {
            model: model.name(),
            required,
            actual: series.len(),
        });
    }
    Ok(())
}

/// Both model families reject an all-zero history: there is no signal to fit.
pub(crate) fn ensure_not_degenerate(series: &Series) -> Result<(), ForecastError> {
    if series.is_all_zero() {
        return Err(ForecastError::ModelFit(format!(
            "demand for {} is zero on every day",
            series.product_id()
        )));
    }
    Ok(())
}
