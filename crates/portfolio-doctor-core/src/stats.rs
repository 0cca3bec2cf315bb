//! Shared numerics for the analytics engines.
//!
//! Scalar statistics follow the usual conventions for sample data: the
//! `sample_*` estimators divide by `n - 1`, the `population_*` ones by `n`.
//! Every function returns NaN rather than panicking when the input is too
//! short to define the statistic; callers decide the default through
//! [`sanitize`].

use nalgebra::{DMatrix, DVector};
use statrs::statistics::Statistics;
use std::cmp::Ordering;

/// Replace NaN or ±infinity with `default`; finite values pass through.
pub fn sanitize(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

pub fn sample_variance(values: &[f64]) -> f64 {
    values.iter().variance()
}

pub fn population_variance(values: &[f64]) -> f64 {
    values.iter().population_variance()
}

pub fn sample_std_dev(values: &[f64]) -> f64 {
    values.iter().std_dev()
}

pub fn population_std_dev(values: &[f64]) -> f64 {
    values.iter().population_std_dev()
}

/// Sample covariance over the common prefix of two series.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    a[..n].iter().covariance(b[..n].iter())
}

/// Percentile `p` (0..=100) of a **sorted** slice using linear interpolation
/// between closest ranks.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Percentile `p` of unsorted data.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    percentile_sorted(&sorted, p)
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Mean of every column of an observations-by-variables matrix.
pub fn column_means(observations: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        observations.ncols(),
        observations.column_iter().map(|c| {
            if c.is_empty() {
                f64::NAN
            } else {
                c.iter().sum::<f64>() / c.len() as f64
            }
        }),
    )
}

/// Sample covariance matrix of an observations-by-variables matrix.
///
/// With fewer than two observations every entry is NaN.
pub fn covariance_matrix(observations: &DMatrix<f64>) -> DMatrix<f64> {
    let (rows, cols) = observations.shape();
    if rows < 2 {
        return DMatrix::from_element(cols, cols, f64::NAN);
    }
    let means = column_means(observations);
    let centered = DMatrix::from_fn(rows, cols, |i, j| observations[(i, j)] - means[j]);
    (centered.transpose() * &centered) / (rows - 1) as f64
}

/// Pearson correlation matrix derived from a covariance matrix.
///
/// Rows and columns of zero-variance variables are NaN; otherwise the
/// diagonal is exactly 1 and off-diagonal entries are clamped to [-1, 1].
pub fn correlation_from_covariance(cov: &DMatrix<f64>) -> DMatrix<f64> {
    let n = cov.nrows();
    let std_devs: Vec<f64> = (0..n).map(|i| cov[(i, i)].sqrt()).collect();
    DMatrix::from_fn(n, n, |i, j| {
        let denom = std_devs[i] * std_devs[j];
        if !denom.is_finite() || denom <= 0.0 {
            f64::NAN
        } else if i == j {
            1.0
        } else {
            (cov[(i, j)] / denom).clamp(-1.0, 1.0)
        }
    })
}
