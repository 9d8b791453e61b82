//! Naive forecasts used when the configured model cannot be fitted.
//!
//! Neither method can fail on a non-empty series, so the engine can always
//! produce a result once the series is prepared.

use super::linalg::{difference, mean, variance};
use super::model::{DemandModel, FallbackStrategy, FittedDemandModel, PointForecast};
use super::series::Series;
use crate::errors::ForecastError;

#[derive(Debug, Clone)]
pub struct NaiveModel {
    strategy: FallbackStrategy,
    window: usize,
}

impl NaiveModel {
    pub fn new(strategy: FallbackStrategy, window: usize) -> Self {
        Self {
            strategy,
            window: window.max(1),
        }
    }

    pub fn strategy(&self) -> FallbackStrategy {
        self.strategy
    }
}

impl DemandModel for NaiveModel {
    fn name(&self) -> String {
        match self.strategy {
            FallbackStrategy::LastValue => "naive(last_value)".to_string(),
            FallbackStrategy::MovingAverage => format!("naive(moving_average_{})", self.window),
        }
    }

    fn min_observations(&self) -> usize {
        1
    }

    fn fit(&self, series: &Series) -> Result<Box<dyn FittedDemandModel>, ForecastError> {
        let values = series.values();
        let Some(last) = values.last().copied() else {
            return Err(ForecastError::EmptySeries {
                product_id: series.product_id().to_string(),
            });
        };

        let fitted = match self.strategy {
            // Random walk: error grows with the square root of the horizon.
            FallbackStrategy::LastValue => FittedNaive {
                name: self.name(),
                level: last,
                sigma: variance(&difference(values, 1)).sqrt(),
                growing_error: true,
            },
            FallbackStrategy::MovingAverage => {
                let recent = &values[values.len().saturating_sub(self.window)..];
                FittedNaive {
                    name: self.name(),
                    level: mean(recent),
                    sigma: variance(recent).sqrt(),
                    growing_error: false,
                }
            }
        };

        Ok(Box::new(fitted))
    }
}

#[derive(Debug, Clone)]
pub struct FittedNaive {
    name: String,
    level: f64,
    sigma: f64,
    growing_error: bool,
}

impl FittedDemandModel for FittedNaive {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn forecast(&self, horizon: usize) -> Vec<PointForecast> {
        (1..=horizon)
            .map(|h| PointForecast {
                mean: self.level,
                std_error: if self.growing_error {
                    self.sigma * (h as f64).sqrt()
                } else {
                    self.sigma
                },
            })
            .collect()
    }
}
