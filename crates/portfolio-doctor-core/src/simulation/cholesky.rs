use nalgebra::linalg::Cholesky;
use nalgebra::DMatrix;
use tracing::debug;

use crate::error::PortfolioDoctorError;
use crate::types::CovarianceMatrix;
use crate::PortfolioDoctorResult;

/// Relative size below which a Cholesky pivot counts as zero.
///
/// A pivot `L[i,i]` smaller than `PIVOT_TOLERANCE * sqrt(cov[i,i])` means
/// asset `i` is (numerically) a linear combination of the earlier assets.
pub const PIVOT_TOLERANCE: f64 = 1e-6;

/// Lower-triangular `L` with `L * L^T = covariance`.
///
/// Fails with `NotPositiveDefinite` when the matrix has non-finite entries,
/// is not positive definite, or is singular up to [`PIVOT_TOLERANCE`]
/// (e.g. two duplicated assets). No regularization is attempted here.
pub fn cholesky_factor(covariance: &CovarianceMatrix) -> PortfolioDoctorResult<DMatrix<f64>> {
    let values = covariance.values();
    let n = values.nrows();

    if n == 0 {
        return Err(PortfolioDoctorError::InsufficientData(
            "Cannot factorize an empty covariance matrix".into(),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(PortfolioDoctorError::NotPositiveDefinite {
            context: "covariance matrix has non-finite entries".into(),
        });
    }

    let l = Cholesky::new(values.clone())
        .ok_or_else(|| PortfolioDoctorError::NotPositiveDefinite {
            context: "Cholesky factorization of the asset covariance failed".into(),
        })?
        .unpack();

    for i in 0..n {
        let scale = values[(i, i)].sqrt();
        if l[(i, i)] <= PIVOT_TOLERANCE * scale {
            return Err(PortfolioDoctorError::NotPositiveDefinite {
                context: format!(
                    "covariance is singular at asset '{}'",
                    covariance.tickers()[i]
                ),
            });
        }
    }

    debug!(assets = n, "factorized covariance matrix");
    Ok(l)
}
