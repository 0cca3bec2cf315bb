use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use tracing::{debug, warn};

use crate::config::SimulationConfig;
use crate::error::PortfolioDoctorError;
use crate::returns::asset_returns;
use crate::simulation::cholesky::cholesky_factor;
use crate::stats::{self, sanitize};
use crate::types::*;
use crate::PortfolioDoctorResult;

/// Distribution summary of simulated terminal total returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Median total return over the horizon (not annualised)
    pub cagr: f64,
    /// Population standard deviation of total returns across trials
    pub volatility: f64,
    /// Low percentile of total returns
    pub worst_case_percentile: f64,
    pub median_return: f64,
    pub sharpe_ratio: f64,
}

/// Asset-level return moments the simulator draws from.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationModel {
    tickers: Vec<String>,
    mean: DVector<f64>,
    covariance: CovarianceMatrix,
}

impl SimulationModel {
    /// Estimate the daily mean vector and sample covariance from prices.
    pub fn from_prices(prices: &PriceMatrix) -> PortfolioDoctorResult<Self> {
        let returns = asset_returns(prices);
        if returns.num_periods() < 2 {
            return Err(PortfolioDoctorError::InsufficientData(format!(
                "Monte Carlo needs at least 2 return observations, got {}",
                returns.num_periods()
            )));
        }
        Ok(Self {
            tickers: returns.tickers().to_vec(),
            mean: stats::column_means(returns.values()),
            covariance: returns.covariance()?,
        })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> &CovarianceMatrix {
        &self.covariance
    }

    /// Same model with `jitter` loaded onto the covariance diagonal.
    pub fn with_diagonal_jitter(&self, jitter: f64) -> Self {
        Self {
            tickers: self.tickers.clone(),
            mean: self.mean.clone(),
            covariance: self.covariance.with_diagonal_jitter(jitter),
        }
    }

    pub fn factorize(&self) -> PortfolioDoctorResult<DMatrix<f64>> {
        cholesky_factor(&self.covariance)
    }

    /// Simulate `num_simulations` correlated paths and summarize them.
    ///
    /// `factor` is the lower Cholesky factor of this model's covariance.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        factor: &DMatrix<f64>,
        weights: &Weights,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> PortfolioDoctorResult<SimulationResult> {
        let n = self.tickers.len();
        if factor.shape() != (n, n) {
            return Err(PortfolioDoctorError::DimensionMismatch {
                context: "Cholesky factor".into(),
                expected: n,
                actual: factor.nrows(),
            });
        }

        let standard = Normal::new(0.0, 1.0).map_err(|e| PortfolioDoctorError::InvalidInput {
            field: "simulation".into(),
            reason: format!("Standard normal: {e}"),
        })?;

        let w = weights.aligned(&self.tickers);
        let factor_t = factor.transpose();
        let horizon = config.time_horizon;
        let base = config.initial_value;

        debug!(
            simulations = config.num_simulations,
            horizon,
            assets = n,
            "running Monte Carlo"
        );

        let mut total_returns = Vec::with_capacity(config.num_simulations);
        for _ in 0..config.num_simulations {
            let shocks = DMatrix::from_fn(horizon, n, |_, _| rng.sample(standard));
            let correlated = &shocks * &factor_t;
            let daily = DMatrix::from_fn(horizon, n, |t, j| self.mean[j] + correlated[(t, j)]);
            let path = &daily * &w;

            let terminal = path.iter().fold(base, |value, r| value * (1.0 + r));
            total_returns.push(terminal / base - 1.0);
        }

        Ok(summarize(&mut total_returns, config))
    }
}

/// Summary statistics over trial total returns. Non-finite fields become 0.
pub fn summarize(total_returns: &mut [f64], config: &SimulationConfig) -> SimulationResult {
    total_returns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let median_return = stats::percentile_sorted(total_returns, 50.0);
    let worst_case = stats::percentile_sorted(total_returns, config.worst_case_percentile);
    let volatility = stats::population_std_dev(total_returns);
    let cagr = median_return;
    let sharpe_ratio = if volatility == 0.0 {
        0.0
    } else {
        (cagr - config.risk_free_rate) / volatility
    };

    let raw = [cagr, volatility, worst_case, median_return, sharpe_ratio];
    if raw.iter().any(|v| !v.is_finite()) {
        warn!("simulation summary contained non-finite values; substituting 0");
    }

    SimulationResult {
        cagr: sanitize(cagr, 0.0),
        volatility: sanitize(volatility, 0.0),
        worst_case_percentile: sanitize(worst_case, 0.0),
        median_return: sanitize(median_return, 0.0),
        sharpe_ratio: sanitize(sharpe_ratio, 0.0),
    }
}

/// Run the simulation with the configured seed, or fresh entropy if unset.
///
/// A covariance that cannot be factorized is returned as
/// `NotPositiveDefinite`; this function never regularizes.
pub fn run_monte_carlo(
    prices: &PriceMatrix,
    weights: &Weights,
    config: &SimulationConfig,
) -> PortfolioDoctorResult<SimulationResult> {
    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    run_monte_carlo_with_rng(prices, weights, config, &mut rng)
}

/// Same as [`run_monte_carlo`] with a caller-supplied random source.
pub fn run_monte_carlo_with_rng<R: Rng + ?Sized>(
    prices: &PriceMatrix,
    weights: &Weights,
    config: &SimulationConfig,
    rng: &mut R,
) -> PortfolioDoctorResult<SimulationResult> {
    config.validate()?;
    let model = SimulationModel::from_prices(prices)?;
    let factor = model.factorize()?;
    model.simulate(&factor, weights, config, rng)
}
