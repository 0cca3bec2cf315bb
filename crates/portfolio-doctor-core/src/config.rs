use serde::{Deserialize, Serialize};

use crate::error::PortfolioDoctorError;
use crate::types::{Fraction, Percent};
use crate::PortfolioDoctorResult;

/// Every assumption used by the analytics engines.
///
/// All fields are defaulted, so a partial JSON/YAML document overrides only
/// what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub risk: RiskConfig,
    pub diversification: DiversificationConfig,
    pub alerts: AlertThresholds,
    pub simulation: SimulationConfig,
}

impl AnalysisConfig {
    pub fn validate(&self) -> PortfolioDoctorResult<()> {
        self.risk.validate()?;
        self.simulation.validate()?;
        if self.alerts.max_listed_pairs == 0 {
            return Err(PortfolioDoctorError::invalid(
                "alerts.max_listed_pairs",
                "Must list at least one pair",
            ));
        }
        Ok(())
    }
}

/// Assumptions for the closed-form risk metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Annual risk-free rate (as a decimal)
    pub risk_free_rate: Fraction,
    /// Periods per year used for annualisation (252 for daily data)
    pub periods_per_year: f64,
    /// Percentile of the return distribution reported as VaR
    pub var_percentile: Percent,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            periods_per_year: 252.0,
            var_percentile: 5.0,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> PortfolioDoctorResult<()> {
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(PortfolioDoctorError::invalid(
                "risk.periods_per_year",
                "Must be positive",
            ));
        }
        if !(0.0..=100.0).contains(&self.var_percentile) {
            return Err(PortfolioDoctorError::invalid(
                "risk.var_percentile",
                "Must be between 0 and 100",
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(PortfolioDoctorError::invalid(
                "risk.risk_free_rate",
                "Must be finite",
            ));
        }
        Ok(())
    }
}

/// Penalties of the heuristic diversification score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversificationConfig {
    /// Points deducted per unit of HHI
    pub hhi_penalty: f64,
    /// Largest sector fraction tolerated without penalty
    pub sector_cap: Fraction,
    /// Points deducted per unit of sector fraction above the cap
    pub sector_penalty: f64,
    /// Mean correlation above which the flat penalty applies
    pub correlation_cutoff: f64,
    /// Flat penalty for a highly correlated book
    pub correlation_penalty: f64,
}

impl Default for DiversificationConfig {
    fn default() -> Self {
        Self {
            hhi_penalty: 50.0,
            sector_cap: 0.40,
            sector_penalty: 100.0,
            correlation_cutoff: 0.70,
            correlation_penalty: 20.0,
        }
    }
}

/// Thresholds of the alert engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Sector allocation (percent) above which a sector alert is raised
    pub sector_pct: Percent,
    /// Single-position weight (percent) above which an overexposure warning is raised
    pub position_pct: Percent,
    /// Pairwise correlation above which a pair is reported
    pub correlation: f64,
    /// Maximum number of pairs named in the correlation warning
    pub max_listed_pairs: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            sector_pct: 40.0,
            position_pct: 12.0,
            correlation: 0.85,
            max_listed_pairs: 3,
        }
    }
}

/// Monte Carlo parameters and the caller-side policies around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_simulations: usize,
    /// Simulated periods per path
    pub time_horizon: usize,
    /// Notional starting value of every path
    pub initial_value: f64,
    pub risk_free_rate: Fraction,
    /// Percentile of terminal returns reported as the worst case
    pub worst_case_percentile: Percent,
    /// Fixed seed for reproducible runs; fresh entropy when absent
    pub seed: Option<u64>,
    /// Upper bound on `num_simulations * time_horizon`
    pub max_path_steps: usize,
    /// Diagonal loading retried once when the covariance cannot be factorized
    pub diagonal_jitter: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_simulations: 1_000,
            time_horizon: 252,
            initial_value: 10_000.0,
            risk_free_rate: 0.02,
            worst_case_percentile: 5.0,
            seed: None,
            max_path_steps: 5_000_000,
            diagonal_jitter: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> PortfolioDoctorResult<()> {
        if self.num_simulations == 0 {
            return Err(PortfolioDoctorError::invalid(
                "simulation.num_simulations",
                "Must be at least 1",
            ));
        }
        if self.time_horizon == 0 {
            return Err(PortfolioDoctorError::invalid(
                "simulation.time_horizon",
                "Must be at least 1",
            ));
        }
        if !self.initial_value.is_finite() || self.initial_value <= 0.0 {
            return Err(PortfolioDoctorError::invalid(
                "simulation.initial_value",
                "Must be positive",
            ));
        }
        if !(0.0..=100.0).contains(&self.worst_case_percentile) {
            return Err(PortfolioDoctorError::invalid(
                "simulation.worst_case_percentile",
                "Must be between 0 and 100",
            ));
        }
        if let Some(j) = self.diagonal_jitter {
            if !j.is_finite() || j <= 0.0 {
                return Err(PortfolioDoctorError::invalid(
                    "simulation.diagonal_jitter",
                    "Must be positive when set",
                ));
            }
        }
        Ok(())
    }

    /// Reject runs whose path count exceeds `max_path_steps`.
    pub fn check_latency_ceiling(&self) -> PortfolioDoctorResult<()> {
        let steps = self.num_simulations.saturating_mul(self.time_horizon);
        if steps > self.max_path_steps {
            return Err(PortfolioDoctorError::invalid(
                "simulation",
                format!(
                    "{} simulations x {} periods = {steps} steps exceeds the ceiling of {}",
                    self.num_simulations, self.time_horizon, self.max_path_steps
                ),
            ));
        }
        Ok(())
    }
}
