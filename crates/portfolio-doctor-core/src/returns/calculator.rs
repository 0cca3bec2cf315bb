use chrono::NaiveDate;
use nalgebra::DMatrix;
use tracing::debug;

use crate::error::PortfolioDoctorError;
use crate::stats;
use crate::types::*;
use crate::PortfolioDoctorResult;

/// Periodic returns of every asset in a [`PriceMatrix`].
///
/// Row `t` holds `price[t+1] / price[t] - 1` for each column and is stamped
/// with `dates[t]`, the later of the two observation dates.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetReturns {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: DMatrix<f64>,
}

impl AssetReturns {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Observations-by-assets return matrix.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn num_periods(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_assets(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Sample covariance matrix of the asset returns.
    pub fn covariance(&self) -> PortfolioDoctorResult<CovarianceMatrix> {
        if self.num_periods() < 2 {
            return Err(PortfolioDoctorError::InsufficientData(format!(
                "Covariance needs at least 2 return observations, got {}",
                self.num_periods()
            )));
        }
        Ok(CovarianceMatrix::from_square(
            self.tickers.clone(),
            stats::covariance_matrix(&self.values),
        ))
    }

    /// Pearson correlation matrix of the asset returns.
    ///
    /// Never fails: too few observations or a zero-variance asset leave NaN
    /// entries for the caller to sanitize.
    pub fn correlation(&self) -> CorrelationMatrix {
        let cov = stats::covariance_matrix(&self.values);
        CorrelationMatrix::from_square(self.tickers.clone(), stats::correlation_from_covariance(&cov))
    }
}

/// Per-asset periodic returns; the first, undefined row is dropped.
///
/// Fewer than two price rows yield an empty return matrix.
pub fn asset_returns(prices: &PriceMatrix) -> AssetReturns {
    let rows = prices.num_rows().saturating_sub(1);
    let p = prices.values();
    let values = DMatrix::from_fn(rows, prices.num_assets(), |i, j| {
        p[(i + 1, j)] / p[(i, j)] - 1.0
    });
    let dates = prices.dates().iter().skip(1).copied().collect();

    debug!(
        assets = prices.num_assets(),
        periods = rows,
        "computed asset returns"
    );

    AssetReturns {
        dates,
        tickers: prices.tickers().to_vec(),
        values,
    }
}

/// Portfolio return per period: the dot product of the aligned weight
/// vector with that period's asset returns.
///
/// Tickers in `prices` without a weight contribute zero.
pub fn portfolio_returns(prices: &PriceMatrix, weights: &Weights) -> ReturnSeries {
    let returns = asset_returns(prices);
    let w = weights.aligned(returns.tickers());
    let values = (returns.values() * &w).iter().copied().collect();
    ReturnSeries::new(returns.dates().to_vec(), values)
}

/// Periodic returns of a single dated price series.
pub fn series_returns(series: &PriceSeries) -> ReturnSeries {
    let values = series
        .prices
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    let dates = series.dates.iter().skip(1).copied().collect();
    ReturnSeries::new(dates, values)
}
