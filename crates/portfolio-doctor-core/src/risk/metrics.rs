use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::RiskConfig;
use crate::stats::{self, sanitize};
use crate::types::*;
use crate::PortfolioDoctorResult;

/// Beta reported when it is undefined (flat or missing benchmark).
pub const DEFAULT_BETA: f64 = 1.0;

/// Input for standalone portfolio risk metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetricsInput {
    /// Dated periodic portfolio returns (as decimals)
    pub portfolio_returns: ReturnSeries,
    /// Dated periodic benchmark returns, same frequency
    pub benchmark_returns: ReturnSeries,
    #[serde(default)]
    pub config: RiskConfig,
}

/// Closed-form risk profile of a return series. Every field is finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub beta: f64,
    /// Annualised volatility
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Historical VaR: low percentile of raw periodic returns (negative = loss)
    pub var_95: f64,
    /// Most negative peak-to-trough decline (negative or zero)
    pub max_drawdown: f64,
}

impl RiskMetrics {
    /// Replace non-finite fields with their documented defaults.
    pub fn sanitized(self) -> Self {
        Self {
            beta: sanitize(self.beta, DEFAULT_BETA),
            volatility: sanitize(self.volatility, 0.0),
            sharpe_ratio: sanitize(self.sharpe_ratio, 0.0),
            var_95: sanitize(self.var_95, 0.0),
            max_drawdown: sanitize(self.max_drawdown, 0.0),
        }
    }

    fn is_finite(&self) -> bool {
        [
            self.beta,
            self.volatility,
            self.sharpe_ratio,
            self.var_95,
            self.max_drawdown,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Compute beta, volatility, Sharpe, historical VaR and max drawdown.
///
/// Never fails: short or empty series degrade to the defaults
/// (`beta = 1`, everything else `0`).
pub fn compute_risk_metrics(
    portfolio: &ReturnSeries,
    benchmark: &ReturnSeries,
    config: &RiskConfig,
) -> RiskMetrics {
    let returns = &portfolio.values;

    let volatility = annualised_volatility(returns, config.periods_per_year);
    let mean_annual = stats::mean(returns) * config.periods_per_year;
    let sharpe_ratio = if volatility == 0.0 {
        0.0
    } else {
        (mean_annual - config.risk_free_rate) / volatility
    };

    let raw = RiskMetrics {
        beta: beta(portfolio, benchmark),
        volatility,
        sharpe_ratio,
        var_95: historical_var(returns, config.var_percentile),
        max_drawdown: max_drawdown(returns),
    };

    if !raw.is_finite() {
        warn!(
            observations = returns.len(),
            "risk metrics contained non-finite values; substituting defaults"
        );
    }
    let metrics = raw.sanitized();
    debug!(?metrics, "computed risk metrics");
    metrics
}

/// Risk metrics wrapped in the standard computation envelope.
pub fn calculate_risk_metrics(
    input: &RiskMetricsInput,
) -> PortfolioDoctorResult<ComputationOutput<RiskMetrics>> {
    let start = Instant::now();
    input.config.validate()?;

    let mut warnings = Vec::new();
    if input.portfolio_returns.len() < 2 {
        warnings.push(format!(
            "Only {} portfolio return observation(s); volatility and Sharpe default to 0",
            input.portfolio_returns.len()
        ));
    }

    let output = compute_risk_metrics(
        &input.portfolio_returns,
        &input.benchmark_returns,
        &input.config,
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Historical risk metrics (beta, volatility, Sharpe, historical VaR, max drawdown)",
        &serde_json::json!({
            "observations": input.portfolio_returns.len(),
            "risk_free_rate": input.config.risk_free_rate,
            "periods_per_year": input.config.periods_per_year,
            "var_percentile": input.config.var_percentile,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Sample standard deviation scaled by `sqrt(periods_per_year)`.
pub fn annualised_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    stats::sample_std_dev(returns) * periods_per_year.sqrt()
}

/// Beta of the portfolio against the benchmark over their common dates.
///
/// Sample covariance over the population variance of the benchmark.
/// Returns [`DEFAULT_BETA`] when that variance is zero (one shared date or a
/// flat benchmark) and NaN when no dates are shared.
pub fn beta(portfolio: &ReturnSeries, benchmark: &ReturnSeries) -> f64 {
    let bench_by_date: HashMap<NaiveDate, f64> = benchmark
        .dates
        .iter()
        .copied()
        .zip(benchmark.values.iter().copied())
        .collect();

    let (port, bench): (Vec<f64>, Vec<f64>) = portfolio
        .dates
        .iter()
        .zip(&portfolio.values)
        .filter_map(|(d, p)| bench_by_date.get(d).map(|b| (*p, *b)))
        .unzip();

    let variance = stats::population_variance(&bench);
    if variance == 0.0 {
        return DEFAULT_BETA;
    }
    stats::sample_covariance(&port, &bench) / variance
}

/// Historical-simulation VaR: the `percentile`-th percentile of raw returns.
pub fn historical_var(returns: &[f64], percentile: f64) -> f64 {
    stats::percentile(returns, percentile)
}

/// Most negative drawdown of the compounded value curve.
///
/// The running peak starts at the first compounded value, so a loss on the
/// first period alone is not a drawdown.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for r in returns {
        cumulative *= 1.0 + r;
        peak = peak.max(cumulative);
        worst = worst.min(cumulative / peak - 1.0);
    }

    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    fn series(values: Vec<f64>) -> ReturnSeries {
        ReturnSeries::new(dates(values.len()), values)
    }

    #[test]
    fn test_volatility_annualised_with_sample_std() {
        let r = vec![0.01, -0.01, 0.01, -0.01];
        let sd = stats::sample_std_dev(&r);
        assert_relative_eq!(annualised_volatility(&r, 252.0), sd * 252f64.sqrt());
    }

    #[test]
    fn test_sharpe_uses_annual_mean_and_risk_free() {
        let p = series(vec![0.01, 0.02, 0.0, 0.01]);
        let m = compute_risk_metrics(&p, &p, &RiskConfig::default());
        let expected = (0.01 * 252.0 - 0.02) / m.volatility;
        assert_relative_eq!(m.sharpe_ratio, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_beta_against_itself_scales_by_n_over_n_minus_one() {
        let p = series(vec![0.01, -0.02, 0.015, 0.003, -0.007]);
        assert_relative_eq!(beta(&p, &p), 5.0 / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beta_of_levered_series() {
        // cov uses n - 1, var uses n: 2 * 3 / 2
        let b = series(vec![0.01, -0.02, 0.015]);
        let p = series(b.values.iter().map(|v| v * 2.0).collect());
        assert_relative_eq!(beta(&p, &b), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beta_uses_only_shared_dates() {
        let all = dates(6);
        let b = ReturnSeries::new(all[..4].to_vec(), vec![0.01, -0.01, 0.02, 0.0]);
        let p = ReturnSeries::new(
            all[2..].to_vec(),
            vec![0.04, 0.0, 0.5, -0.5],
        );
        // Shared dates are all[2], all[3]: portfolio (0.04, 0.0), benchmark (0.02, 0.0).
        // cov = 0.0004, var = 0.0001
        assert_relative_eq!(beta(&p, &b), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_shared_date_beta_defaults() {
        let p = series(vec![0.03]);
        let b = series(vec![0.01]);
        assert_eq!(beta(&p, &b), DEFAULT_BETA);
    }

    #[test]
    fn test_flat_benchmark_beta_defaults() {
        let p = series(vec![0.01, -0.02, 0.015]);
        let b = series(vec![0.0, 0.0, 0.0]);
        assert_eq!(beta(&p, &b), DEFAULT_BETA);
        assert_eq!(compute_risk_metrics(&p, &b, &RiskConfig::default()).beta, 1.0);
    }

    #[test]
    fn test_historical_var_is_fifth_percentile() {
        let r: Vec<f64> = (0..101).map(|i| (i as f64 - 50.0) / 1000.0).collect();
        assert_relative_eq!(historical_var(&r, 5.0), -0.045, epsilon = 1e-12);
    }

    #[test]
    fn test_max_drawdown() {
        // 1.1 -> 0.88 -> 0.924 -> 0.7854: peak 1.1, trough 0.7854
        let dd = max_drawdown(&[0.10, -0.20, 0.05, -0.15]);
        assert_relative_eq!(dd, 0.7854 / 1.1 - 1.0, epsilon = 1e-12);
        assert!(dd < -0.28);
    }

    #[test]
    fn test_first_period_loss_is_not_a_drawdown() {
        assert_eq!(max_drawdown(&[-0.10]), 0.0);
        assert_eq!(max_drawdown(&[0.01, 0.02]), 0.0);
    }

    #[test]
    fn test_empty_series_degrades_to_defaults() {
        let empty = ReturnSeries::default();
        let m = compute_risk_metrics(&empty, &empty, &RiskConfig::default());
        assert_eq!(
            m,
            RiskMetrics {
                beta: 1.0,
                volatility: 0.0,
                sharpe_ratio: 0.0,
                var_95: 0.0,
                max_drawdown: 0.0,
            }
        );
    }

    #[test]
    fn test_envelope_warns_on_short_series() {
        let input = RiskMetricsInput {
            portfolio_returns: series(vec![0.01]),
            benchmark_returns: series(vec![0.02]),
            config: RiskConfig::default(),
        };
        let out = calculate_risk_metrics(&input).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(!out.warnings[0].contains("VaR"));
        assert_eq!(out.result.volatility, 0.0);
        assert_eq!(out.result.var_95, 0.01);
    }
}
