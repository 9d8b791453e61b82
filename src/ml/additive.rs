//! Additive trend + weekly seasonality model.
//!
//! `demand(t) = level + slope·t + weekday_effect(t)`, fitted by ordinary least
//! squares. Weekday effects are centred so they sum to zero and the level
//! carries the average day.

use chrono::Datelike;
use nalgebra::{DMatrix, DVector};

use super::linalg::{mean, solve_least_squares};
use super::model::{
    ensure_min_observations, ensure_not_degenerate, DemandModel, FittedDemandModel, PointForecast,
};
use super::series::Series;
use crate::errors::ForecastError;

/// Two full weeks, so every weekday is seen at least twice.
pub const MIN_OBSERVATIONS: usize = 14;

const DAYS_IN_WEEK: usize = 7;
// intercept, slope and one dummy per weekday except Monday
const PARAMETERS: usize = 2 + DAYS_IN_WEEK - 1;

#[derive(Debug, Clone, Default)]
pub struct AdditiveModel;

impl AdditiveModel {
    pub fn new() -> Self {
        Self
    }
}

impl DemandModel for AdditiveModel {
    fn name(&self) -> String {
        "additive(trend+weekly)".to_string()
    }

    fn min_observations(&self) -> usize {
        MIN_OBSERVATIONS
    }

    fn fit(&self, series: &Series) -> Result<Box<dyn FittedDemandModel>, ForecastError> {
        ensure_min_observations(self, series)?;
        ensure_not_degenerate(series)?;

        let n = series.len();
        let weekday = |i: usize| series.date_at(i).weekday().num_days_from_monday() as usize;

        let x = DMatrix::from_fn(n, PARAMETERS, |r, c| match c {
            0 => 1.0,
            1 => r as f64,
            _ => {
                if weekday(r) == c - 1 {
                    1.0
                } else {
                    0.0
                }
            }
        });
        let y = DVector::from_row_slice(series.values());

        let beta = solve_least_squares(&x, &y).ok_or_else(|| {
            ForecastError::ModelFit("least-squares solve for trend and weekday terms failed".into())
        })?;

        let residuals = &y - &x * &beta;
        let sse = residuals.norm_squared();
        let sigma = (sse / n.saturating_sub(PARAMETERS).max(1) as f64).sqrt();

        let mut weekly = [0.0; DAYS_IN_WEEK];
        for (day, effect) in weekly.iter_mut().enumerate().skip(1) {
            *effect = beta[day + 1];
        }
        let offset = mean(&weekly);
        for effect in weekly.iter_mut() {
            *effect -= offset;
        }

        let fitted = FittedAdditive {
            level: beta[0] + offset,
            slope: beta[1],
            weekly,
            sigma,
            next_index: n,
            next_weekday: (weekday(n - 1) + 1) % DAYS_IN_WEEK,
        };

        if !fitted.is_finite() {
            return Err(ForecastError::ModelFit(
                "additive model produced non-finite coefficients".into(),
            ));
        }

        Ok(Box::new(fitted))
    }
}

#[derive(Debug, Clone)]
pub struct FittedAdditive {
    level: f64,
    slope: f64,
    /// Monday first
    weekly: [f64; DAYS_IN_WEEK],
    sigma: f64,
    next_index: usize,
    next_weekday: usize,
}

impl FittedAdditive {
    fn is_finite(&self) -> bool {
        self.level.is_finite()
            && self.slope.is_finite()
            && self.sigma.is_finite()
            && self.weekly.iter().all(|w| w.is_finite())
    }
}

impl FittedDemandModel for FittedAdditive {
    fn name(&self) -> String {
        "additive(trend+weekly)".to_string()
    }

    fn forecast(&self, horizon: usize) -> Vec<PointForecast> {
        (0..horizon)
            .map(|step| {
                let t = (self.next_index + step) as f64;
                let day = (self.next_weekday + step) % DAYS_IN_WEEK;
                PointForecast {
                    mean: self.level + self.slope * t + self.weekly[day],
                    std_error: self.sigma,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2025-01-06 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[test]
    fn recovers_weekly_pattern_and_trend() {
        let pattern = [10.0, 12.0, 11.0, 13.0, 18.0, 25.0, 20.0];
        let values: Vec<f64> = (0..56)
            .map(|i| pattern[i % 7] + 0.5 * i as f64)
            .collect();
        let series = Series::from_daily_values("CURD-500G", monday(), values);

        let fitted = AdditiveModel::new().fit(&series).unwrap();
        let forecast = fitted.forecast(7);

        // Day 56 is a Monday again.
        for (step, point) in forecast.iter().enumerate() {
            let expected = pattern[step] + 0.5 * (56 + step) as f64;
            assert!(
                (point.mean - expected).abs() < 1e-6,
                "step {}: {} vs {}",
                step,
                point.mean,
                expected
            );
            assert!(point.std_error < 1e-6);
        }
    }

    #[test]
    fn isolated_weekend_spike_is_captured() {
        let values: Vec<f64> = (0..28).map(|i| if i % 7 == 5 { 30.0 } else { 10.0 }).collect();
        let series = Series::from_daily_values("PANEER-200G", monday(), values);
        let model = AdditiveModel::new();
        let fitted = model.fit(&series).unwrap();
        let forecast = fitted.forecast(7);
        let saturday = forecast[5].mean;
        assert!((saturday - 30.0).abs() < 1e-6);
        assert!((forecast[0].mean - 10.0).abs() < 1e-6);
    }

    #[test]
    fn short_series_is_insufficient() {
        let series = Series::from_daily_values("MILK-1L", monday(), vec![1.0; 10]);
        assert!(matches!(
            AdditiveModel::new().fit(&series),
            Err(ForecastError::InsufficientData { required: 14, actual: 10, .. })
        ));
    }
}
