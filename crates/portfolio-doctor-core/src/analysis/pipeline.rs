use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, SimulationConfig};
use crate::diversification::{compute_diversification, generate_alerts, DiversificationMetrics};
use crate::error::PortfolioDoctorError;
use crate::returns::{align_prices, asset_returns, portfolio_returns, series_returns};
use crate::risk::{compute_risk_metrics, RiskMetrics};
use crate::simulation::{SimulationModel, SimulationResult};
use crate::types::*;
use crate::PortfolioDoctorResult;

/// Pre-fetched market data for every holding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    /// Dated price history per ticker; aligned onto common dates before use
    pub prices: BTreeMap<String, PriceSeries>,
    #[serde(default)]
    pub sectors: SectorMap,
    /// Benchmark price series over the same period
    #[serde(default)]
    pub benchmark: Option<PriceSeries>,
}

/// A portfolio plus the market data needed to analyze it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub holdings: Vec<Holding>,
    pub market_data: MarketData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityForecast {
    /// Annualised volatility of the historical portfolio returns
    pub historical: f64,
    /// Dispersion of simulated total returns over the horizon
    pub simulated: f64,
}

/// Everything the engines produce for one portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub diversification: DiversificationMetrics,
    pub risk_profile: RiskMetrics,
    pub sector_alerts: Vec<String>,
    pub overexposure_warnings: Vec<String>,
    pub volatility_forecast: VolatilityForecast,
    pub simulation: SimulationResult,
    /// Ticker-keyed correlations; non-finite entries reported as 0.0
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Diversification and alerts without the risk or simulation stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversificationReport {
    pub diversification: DiversificationMetrics,
    pub sector_alerts: Vec<String>,
    pub overexposure_warnings: Vec<String>,
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Validated, fraction-scaled view of an [`AnalysisInput`].
struct Prepared {
    portfolio: Portfolio,
    weights: Weights,
    prices: PriceMatrix,
}

fn prepare(input: &AnalysisInput) -> PortfolioDoctorResult<Prepared> {
    let portfolio = Portfolio::new(input.holdings.clone());
    portfolio.validate()?;
    let weights = Weights::from_portfolio(&portfolio);
    let prices = align_prices(&portfolio.tickers(), &input.market_data.prices)?;
    debug!(
        holdings = portfolio.holdings.len(),
        rows = prices.num_rows(),
        "prepared analysis input"
    );
    Ok(Prepared {
        portfolio,
        weights,
        prices,
    })
}

fn sector_warnings(portfolio: &Portfolio, sectors: &SectorMap) -> Vec<String> {
    portfolio
        .holdings
        .iter()
        .filter(|h| !sectors.contains_key(&h.ticker))
        .map(|h| format!("No sector label for {}; grouped under {UNKNOWN_SECTOR}", h.ticker))
        .collect()
}

/// Run the full analysis, seeding the simulation from the config or fresh entropy.
pub fn analyze_portfolio(
    input: &AnalysisInput,
    config: &AnalysisConfig,
) -> PortfolioDoctorResult<ComputationOutput<AnalysisResult>> {
    let mut rng = match config.simulation.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    analyze_portfolio_with_rng(input, config, &mut rng)
}

/// Full analysis with a caller-supplied random source.
///
/// The closed-form metrics and the Monte Carlo simulation run on separate
/// rayon workers. A covariance that cannot be factorized is retried once
/// with `simulation.diagonal_jitter` when configured, otherwise the
/// `NotPositiveDefinite` error is returned.
pub fn analyze_portfolio_with_rng<R: Rng + Send + ?Sized>(
    input: &AnalysisInput,
    config: &AnalysisConfig,
    rng: &mut R,
) -> PortfolioDoctorResult<ComputationOutput<AnalysisResult>> {
    let start = Instant::now();
    config.validate()?;
    config.simulation.check_latency_ceiling()?;

    let benchmark = input.market_data.benchmark.as_ref().ok_or_else(|| {
        PortfolioDoctorError::invalid("market_data.benchmark", "A benchmark price series is required")
    })?;
    benchmark.validate("market_data.benchmark")?;

    let Prepared {
        portfolio,
        weights,
        prices,
    } = prepare(input)?;
    let sectors = &input.market_data.sectors;

    let mut warnings = sector_warnings(&portfolio, sectors);

    let (closed_form, simulated) = rayon::join(
        || {
            let port = portfolio_returns(&prices, &weights);
            let bench = series_returns(benchmark);
            let correlation = asset_returns(&prices).correlation();
            let risk = compute_risk_metrics(&port, &bench, &config.risk);
            let diversification =
                compute_diversification(&weights, sectors, &correlation, &config.diversification);
            let alerts = generate_alerts(
                &weights,
                &diversification.sector_allocation,
                &correlation,
                &config.alerts,
            );
            let flat_benchmark = crate::stats::sample_variance(&bench.values) == 0.0;
            (port.len(), flat_benchmark, risk, diversification, alerts, correlation)
        },
        || simulate_with_policy(&prices, &weights, &config.simulation, rng),
    );

    let (observations, flat_benchmark, risk_profile, diversification, alerts, correlation) =
        closed_form;
    let (simulation, jitter_warning) = simulated?;

    if observations < 2 {
        warnings.push(format!(
            "Only {observations} aligned return observation(s); volatility and Sharpe default to 0"
        ));
    }
    if flat_benchmark {
        warnings.push("Benchmark has zero variance; beta defaults to 1.0".into());
    }
    warnings.extend(jitter_warning);

    let result = AnalysisResult {
        volatility_forecast: VolatilityForecast {
            historical: risk_profile.volatility,
            simulated: simulation.volatility,
        },
        diversification,
        risk_profile,
        sector_alerts: alerts.sector_alerts,
        overexposure_warnings: alerts.overexposure_warnings,
        simulation,
        correlation_matrix: correlation.to_map(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    info!(
        holdings = portfolio.holdings.len(),
        elapsed_us = elapsed,
        "portfolio analysis complete"
    );

    Ok(with_metadata(
        "Historical risk metrics, HHI/sector/correlation diversification score, \
         threshold alerts and Cholesky-correlated Monte Carlo simulation",
        config,
        warnings,
        elapsed,
        result,
    ))
}

/// Factorize, retrying once with diagonal jitter when configured.
///
/// Returns the simulation summary and the warning to surface if jitter was used.
fn simulate_with_policy<R: Rng + ?Sized>(
    prices: &PriceMatrix,
    weights: &Weights,
    config: &SimulationConfig,
    rng: &mut R,
) -> PortfolioDoctorResult<(SimulationResult, Option<String>)> {
    let model = SimulationModel::from_prices(prices)?;
    match model.factorize() {
        Ok(factor) => Ok((model.simulate(&factor, weights, config, rng)?, None)),
        Err(e) if e.is_numerical() => {
            let Some(jitter) = config.diagonal_jitter else {
                return Err(e);
            };
            warn!(jitter, error = %e, "retrying covariance factorization with diagonal jitter");
            let regularized = model.with_diagonal_jitter(jitter);
            let factor = regularized.factorize()?;
            let result = regularized.simulate(&factor, weights, config, rng)?;
            Ok((
                result,
                Some(format!(
                    "Covariance was singular; simulated with diagonal jitter {jitter:e}"
                )),
            ))
        }
        Err(e) => Err(e),
    }
}

/// Diversification score and alerts only; no benchmark needed.
pub fn assess_diversification(
    input: &AnalysisInput,
    config: &AnalysisConfig,
) -> PortfolioDoctorResult<ComputationOutput<DiversificationReport>> {
    let start = Instant::now();
    config.validate()?;
    let prepared = prepare(input)?;
    let sectors = &input.market_data.sectors;

    let correlation = asset_returns(&prepared.prices).correlation();
    let diversification = compute_diversification(
        &prepared.weights,
        sectors,
        &correlation,
        &config.diversification,
    );
    let alerts = generate_alerts(
        &prepared.weights,
        &diversification.sector_allocation,
        &correlation,
        &config.alerts,
    );

    let report = DiversificationReport {
        diversification,
        sector_alerts: alerts.sector_alerts,
        overexposure_warnings: alerts.overexposure_warnings,
        correlation_matrix: correlation.to_map(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "HHI concentration, sector skew and mean-correlation diversification score with threshold alerts",
        &serde_json::json!({
            "diversification": config.diversification,
            "alerts": config.alerts,
        }),
        sector_warnings(&prepared.portfolio, sectors),
        elapsed,
        report,
    ))
}

/// Monte Carlo simulation only, with the same jitter policy as the full analysis.
pub fn simulate_portfolio(
    input: &AnalysisInput,
    config: &AnalysisConfig,
) -> PortfolioDoctorResult<ComputationOutput<SimulationResult>> {
    let start = Instant::now();
    config.simulation.validate()?;
    config.simulation.check_latency_ceiling()?;
    let prepared = prepare(input)?;

    let mut rng = match config.simulation.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let (result, jitter_warning) = simulate_with_policy(
        &prepared.prices,
        &prepared.weights,
        &config.simulation,
        &mut rng,
    )?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo simulation of correlated asset returns via Cholesky factorization",
        &config.simulation,
        jitter_warning.into_iter().collect(),
        elapsed,
        result,
    ))
}
