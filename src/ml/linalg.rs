//! Small linear-algebra helpers shared by the model estimators.
//!
//! Every estimator here reduces to repeated least-squares problems with a
//! handful of columns, so the SVD route is cheap and also copes with the
//! rank-deficient designs that short or constant series produce.

use nalgebra::{DMatrix, DVector};

const RELATIVE_TOLERANCE: f64 = 1e-10;

/// Solve `min ||x·β - y||²` using SVD.
///
/// Singular values below `RELATIVE_TOLERANCE · max(σ)` are dropped, so
/// collinear lag columns get the minimum-norm solution instead of blowing up.
/// Returns `None` for a malformed system or a non-finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 || x.nrows() != y.len() {
        return None;
    }
    if x.iter().all(|v| *v == 0.0) {
        return Some(DVector::zeros(x.ncols()));
    }

    let svd = x.clone().svd(true, true);
    let cutoff = svd.singular_values.max() * RELATIVE_TOLERANCE;

    svd.solve(y, cutoff)
        .ok()
        .filter(|beta| beta.iter().all(|v| v.is_finite()))
}

/// Apply `d` rounds of first differencing.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Last value of the series after each differencing round `0..d`.
///
/// These are the anchors needed to integrate differenced forecasts back to
/// levels.
pub fn difference_anchors(series: &[f64], d: usize) -> Vec<f64> {
    let mut anchors = Vec::with_capacity(d);
    let mut current = series.to_vec();
    for _ in 0..d {
        anchors.push(current.last().copied().unwrap_or(0.0));
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    anchors
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator); zero for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Whether every root of `1 - c₁B - … - cₖBᵏ` lies outside the unit circle,
/// i.e. the companion matrix of `coeffs` has spectral radius below one.
pub fn roots_outside_unit_circle(coeffs: &[f64]) -> bool {
    let k = coeffs.len();
    if k == 0 {
        return true;
    }
    if k == 1 {
        return coeffs[0].abs() < 1.0;
    }

    let mut companion = DMatrix::<f64>::zeros(k, k);
    for (j, c) in coeffs.iter().enumerate() {
        companion[(0, j)] = *c;
    }
    for i in 1..k {
        companion[(i, i - 1)] = 1.0;
    }

    companion
        .complex_eigenvalues()
        .iter()
        .all(|root| root.norm() < 1.0)
}
