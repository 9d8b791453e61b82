//! ARIMA(p, d, q) demand model.
//!
//! Estimation follows the Hannan–Rissanen scheme: a long autoregression
//! provides first-pass innovations, then AR and MA coefficients are fitted
//! jointly by least squares on lagged values and lagged innovations. The
//! regression is repeated with the conditional residuals of the previous pass
//! until the coefficients settle. Every pass is scored by its conditional sum
//! of squares and the best admissible one (stationary AR part, invertible MA
//! part) is kept. The drift-only estimate is always admissible, so very short
//! series still fit.
//!
//! The differenced series is centred on its mean, so for `d > 0` the model
//! carries a drift term and a steadily trending history keeps trending.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::linalg::{
    difference, difference_anchors, mean, roots_outside_unit_circle, solve_least_squares,
};
use super::model::{
    ensure_min_observations, ensure_not_degenerate, DemandModel, FittedDemandModel, ModelOrder,
    PointForecast,
};
use super::series::Series;
use crate::errors::ForecastError;

const MAX_ITERATIONS: usize = 25;
const CONVERGENCE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Arima {
    order: ModelOrder,
}

impl Arima {
    pub fn new(order: ModelOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Estimate coefficients from raw daily values.
    pub fn estimate(&self, values: &[f64]) -> Result<FittedArima, ForecastError> {
        let ModelOrder { p, d, q } = self.order;

        let differenced = difference(values, d);
        let drift = mean(&differenced);
        let z: Vec<f64> = differenced.iter().map(|v| v - drift).collect();
        let start = p.max(q);

        // Drift only, admissible by construction.
        let mut best = Estimate::new(&z, vec![0.0; p], vec![0.0; q], start);

        // Pure autoregression is always a candidate.
        let zeros = vec![0.0; z.len()];
        if let Some((ar, _)) = regress(&z, &zeros, p, 0, start) {
            keep_better(&mut best, Estimate::new(&z, ar, vec![0.0; q], start));
        }

        let mut iterations = 0;
        let mut converged = q == 0;

        if q > 0 {
            let mut innovations = long_autoregression_innovations(&z, p + q);
            let mut previous: Option<Vec<f64>> = None;

            while iterations < MAX_ITERATIONS {
                iterations += 1;
                let Some((ar, ma)) = regress(&z, &innovations, p, q, start) else {
                    break;
                };

                let coefficients: Vec<f64> = ar.iter().chain(ma.iter()).copied().collect();
                let candidate = Estimate::new(&z, ar, ma, start);
                innovations = candidate.residuals.clone();
                keep_better(&mut best, candidate);

                if let Some(prev) = &previous {
                    let delta = prev
                        .iter()
                        .zip(&coefficients)
                        .map(|(a, b)| (a - b).abs())
                        .fold(0.0, f64::max);
                    if delta < CONVERGENCE_TOLERANCE {
                        converged = true;
                        break;
                    }
                }
                previous = Some(coefficients);
            }
        }

        let rows = z.len() - start;
        let dof = rows.saturating_sub(p + q).max(1);
        let sigma2 = best.css / dof as f64;
        if !sigma2.is_finite() {
            return Err(ForecastError::ModelFit(format!(
                "residual variance is not finite for ARIMA{}",
                self.order
            )));
        }

        debug!(
            order = %self.order,
            iterations,
            converged,
            css = best.css,
            "ARIMA estimation finished"
        );

        Ok(FittedArima {
            order: self.order,
            recent: z[z.len() - p..].to_vec(),
            recent_innovations: best.residuals[best.residuals.len() - q..].to_vec(),
            ar: best.ar,
            ma: best.ma,
            drift,
            sigma2,
            anchors: difference_anchors(values, d),
            converged,
        })
    }
}

impl DemandModel for Arima {
    fn name(&self) -> String {
        format!("ARIMA{}", self.order)
    }

    fn min_observations(&self) -> usize {
        self.order.min_observations()
    }

    fn fit(&self, series: &Series) -> Result<Box<dyn FittedDemandModel>, ForecastError> {
        ensure_min_observations(self, series)?;
        ensure_not_degenerate(series)?;
        Ok(Box::new(self.estimate(series.values())?))
    }
}

/// Fitted ARIMA state.
#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ModelOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    drift: f64,
    sigma2: f64,
    /// Last `p` centred values of the differenced series, oldest first
    recent: Vec<f64>,
    /// Last `q` innovations, oldest first
    recent_innovations: Vec<f64>,
    anchors: Vec<f64>,
    converged: bool,
}

impl FittedArima {
    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    pub fn drift(&self) -> f64 {
        self.drift
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// ψ-weights of the integrated process, used for forecast error growth.
    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        let mut poly: Vec<f64> = std::iter::once(1.0)
            .chain(self.ar.iter().map(|phi| -phi))
            .collect();
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let a: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

        let mut psi = vec![0.0; horizon];
        if horizon == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..horizon {
            let mut value = if j <= self.ma.len() { self.ma[j - 1] } else { 0.0 };
            for i in 1..=j.min(a.len()) {
                value += a[i - 1] * psi[j - i];
            }
            psi[j] = value;
        }
        psi
    }
}

impl FittedDemandModel for FittedArima {
    fn name(&self) -> String {
        format!("ARIMA{}", self.order)
    }

    fn forecast(&self, horizon: usize) -> Vec<PointForecast> {
        let psi = self.psi_weights(horizon);
        let mut values = self.recent.clone();
        let mut innovations = self.recent_innovations.clone();
        let mut anchors = self.anchors.clone();
        let mut cumulative = 0.0;
        let mut out = Vec::with_capacity(horizon);

        for weight in psi {
            let ar_part: f64 = self
                .ar
                .iter()
                .enumerate()
                .map(|(i, phi)| phi * values[values.len() - 1 - i])
                .sum();
            let ma_part: f64 = self
                .ma
                .iter()
                .enumerate()
                .map(|(j, theta)| theta * innovations[innovations.len() - 1 - j])
                .sum();
            let next = ar_part + ma_part;
            values.push(next);
            // Future innovations have zero expectation.
            innovations.push(0.0);

            let mut level = next + self.drift;
            for anchor in anchors.iter_mut().rev() {
                *anchor += level;
                level = *anchor;
            }

            cumulative += weight * weight;
            out.push(PointForecast {
                mean: level,
                std_error: (self.sigma2 * cumulative).sqrt(),
            });
        }

        out
    }
}

#[derive(Debug, Clone)]
struct Estimate {
    ar: Vec<f64>,
    ma: Vec<f64>,
    residuals: Vec<f64>,
    css: f64,
}

impl Estimate {
    fn new(z: &[f64], ar: Vec<f64>, ma: Vec<f64>, start: usize) -> Self {
        let residuals = conditional_residuals(z, &ar, &ma, start);
        let css = residuals[start..].iter().map(|e| e * e).sum();
        Self {
            ar,
            ma,
            residuals,
            css,
        }
    }

    fn is_admissible(&self) -> bool {
        let negated_ma: Vec<f64> = self.ma.iter().map(|theta| -theta).collect();
        self.css.is_finite()
            && self.ar.iter().chain(self.ma.iter()).all(|c| c.is_finite())
            && roots_outside_unit_circle(&self.ar)
            && roots_outside_unit_circle(&negated_ma)
    }
}

fn keep_better(best: &mut Estimate, candidate: Estimate) {
    if candidate.is_admissible() && candidate.css < best.css {
        *best = candidate;
    }
}

/// Least-squares fit of `z_t` on `p` lagged values and `q` lagged
/// innovations, using rows `start..n`.
fn regress(
    z: &[f64],
    innovations: &[f64],
    p: usize,
    q: usize,
    start: usize,
) -> Option<(Vec<f64>, Vec<f64>)> {
    let cols = p + q;
    if cols == 0 {
        return Some((Vec::new(), Vec::new()));
    }
    let rows = z.len().checked_sub(start).filter(|r| *r > 0)?;

    let x = DMatrix::from_fn(rows, cols, |r, c| {
        let t = start + r;
        if c < p {
            z[t - 1 - c]
        } else {
            innovations[t - 1 - (c - p)]
        }
    });
    let y = DVector::from_iterator(rows, z[start..].iter().copied());

    let beta = solve_least_squares(&x, &y)?;
    let ar = beta.iter().take(p).copied().collect();
    let ma = beta.iter().skip(p).copied().collect();
    Some((ar, ma))
}

/// One-step residuals with pre-sample innovations set to zero.
fn conditional_residuals(z: &[f64], ar: &[f64], ma: &[f64], start: usize) -> Vec<f64> {
    let mut residuals = vec![0.0; z.len()];
    for t in start..z.len() {
        let ar_part: f64 = ar.iter().enumerate().map(|(i, phi)| phi * z[t - 1 - i]).sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .map(|(j, theta)| theta * residuals[t - 1 - j])
            .sum();
        residuals[t] = z[t] - ar_part - ma_part;
    }
    residuals
}

/// First-pass innovations from a long pure autoregression. Falls back to
/// zeros when the series is too short to support one.
fn long_autoregression_innovations(z: &[f64], min_order: usize) -> Vec<f64> {
    let n = z.len();
    let by_length = (n as f64).ln().ceil() as usize;
    let order = by_length.max(min_order + 1).min(n.saturating_sub(1) / 2);
    if order == 0 {
        return vec![0.0; n];
    }

    let zeros = vec![0.0; n];
    match regress(z, &zeros, order, 0, order) {
        Some((phi, _)) => conditional_residuals(z, &phi, &[], order),
        None => zeros,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn series(values: Vec<f64>) -> Series {
        Series::from_daily_values(
            "MILK-1L",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            values,
        )
    }

    #[test]
    fn recovers_ar1_coefficient() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut values = Vec::with_capacity(600);
        let mut x = 0.0;
        for _ in 0..600 {
            x = 0.6 * x + rng.gen_range(-1.0..1.0);
            values.push(50.0 + x);
        }

        let fitted = Arima::new(ModelOrder::new(1, 0, 0))
            .estimate(&values)
            .unwrap();
        assert!((fitted.ar()[0] - 0.6).abs() < 0.1, "phi = {}", fitted.ar()[0]);
        assert!(fitted.converged());
    }

    #[test]
    fn constant_series_forecasts_flat() {
        let fitted = Arima::new(ModelOrder::new(1, 1, 1))
            .fit(&series(vec![100.0; 30]))
            .unwrap();
        let forecast = fitted.forecast(10);
        assert_eq!(forecast.len(), 10);
        for point in forecast {
            assert!((point.mean - 100.0).abs() < 1e-9);
            assert!(point.std_error.abs() < 1e-9);
        }
    }

    #[test]
    fn linear_trend_is_extended() {
        let values: Vec<f64> = (1..=30).map(f64::from).collect();
        let fitted = Arima::new(ModelOrder::new(1, 1, 1))
            .fit(&series(values))
            .unwrap();
        let forecast = fitted.forecast(3);
        assert!((forecast[0].mean - 31.0).abs() < 1e-6);
        assert!((forecast[2].mean - 33.0).abs() < 1e-6);
    }

    #[test]
    fn minimum_length_series_fits() {
        let model = Arima::new(ModelOrder::new(1, 1, 1));
        assert_eq!(model.min_observations(), 4);
        let fitted = model.fit(&series(vec![10.0, 12.0, 11.0, 13.0])).unwrap();
        let forecast = fitted.forecast(5);
        assert_eq!(forecast.len(), 5);
        assert!(forecast.iter().all(|p| p.mean.is_finite() && p.std_error.is_finite()));
    }

    #[test]
    fn unit_root_estimate_falls_back_to_drift() {
        // Centred values are [-1, 1], so least squares puts phi on the unit circle.
        let fitted = Arima::new(ModelOrder::new(1, 0, 0))
            .estimate(&[10.0, 12.0])
            .unwrap();
        assert!(fitted.ar()[0].abs() < 1.0);
        assert!(fitted
            .forecast(3)
            .iter()
            .all(|p| (10.0..=12.0).contains(&p.mean) && p.std_error.is_finite()));

        let fitted = Arima::new(ModelOrder::new(1, 1, 0))
            .estimate(&[10.0, 12.0, 11.0])
            .unwrap();
        assert!(fitted.ar()[0].abs() < 1.0);
        assert!((fitted.drift() - 0.5).abs() < 1e-12);
        let next = fitted.forecast(1)[0].mean;
        assert!((10.0..=13.0).contains(&next), "next = {}", next);
    }

    #[test]
    fn random_minimum_length_series_always_fit() {
        let mut rng = StdRng::seed_from_u64(11);
        for order in [
            ModelOrder::new(2, 1, 2),
            ModelOrder::new(1, 0, 0),
            ModelOrder::new(1, 1, 0),
            ModelOrder::new(2, 0, 1),
        ] {
            let model = Arima::new(order);
            for _ in 0..300 {
                let values: Vec<f64> = (0..order.min_observations())
                    .map(|_| f64::from(rng.gen_range(0..200)))
                    .collect();
                if values.iter().all(|v| *v == 0.0) {
                    continue;
                }
                let fitted = model
                    .fit(&series(values.clone()))
                    .unwrap_or_else(|e| panic!("{} on {:?}: {}", order, values, e));
                let forecast = fitted.forecast(7);
                assert!(forecast
                    .iter()
                    .all(|p| p.mean.is_finite() && p.std_error.is_finite()));
            }
        }
    }

    #[test]
    fn short_series_is_insufficient() {
        let err = Arima::new(ModelOrder::new(1, 1, 1))
            .fit(&series(vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                model: "ARIMA(1,1,1)".into(),
                required: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn all_zero_series_fails_to_fit() {
        let err = Arima::new(ModelOrder::new(1, 0, 0))
            .fit(&series(vec![0.0; 20]))
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelFit(_)));
    }

    #[test]
    fn random_walk_error_grows_with_square_root_of_horizon() {
        let values: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 10.0 } else { 12.0 })
            .collect();
        let fitted = Arima::new(ModelOrder::new(0, 1, 0))
            .fit(&series(values))
            .unwrap();
        let forecast = fitted.forecast(4);
        let ratio = forecast[3].std_error / forecast[0].std_error;
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn psi_weights_for_ar1() {
        let fitted = FittedArima {
            order: ModelOrder::new(1, 0, 0),
            ar: vec![0.5],
            ma: vec![],
            drift: 0.0,
            sigma2: 1.0,
            recent: vec![0.0],
            recent_innovations: vec![],
            anchors: vec![],
            converged: true,
        };
        let psi = fitted.psi_weights(4);
        assert_eq!(psi, vec![1.0, 0.5, 0.25, 0.125]);
    }
}
