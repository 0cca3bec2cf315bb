pub mod analysis;
pub mod diversification;
pub mod risk;
pub mod simulation;

use clap::Args;
use serde::de::DeserializeOwned;
use tracing::debug;

use portfolio_doctor_core::config::SimulationConfig;
use portfolio_doctor_core::AnalysisConfig;

use crate::input;

/// Load the analysis config from `--config`, or the defaults.
pub fn load_config(path: Option<&str>) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => input::file::read_config(p)?,
        None => {
            debug!("no --config given; using default assumptions");
            AnalysisConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Read a typed payload from `--input` or piped stdin.
pub fn read_payload<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::file::read_json(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err(format!("--input <file.json> or stdin required for {what}").into())
    }
}

/// Flags overriding the simulation section of the config
#[derive(Args, Debug, Default)]
pub struct SimulationOverrides {
    /// Seed for a reproducible simulation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of simulated paths
    #[arg(long)]
    pub simulations: Option<usize>,

    /// Periods per simulated path
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Annual risk-free rate used by both Sharpe ratios
    #[arg(long)]
    pub risk_free_rate: Option<f64>,

    /// Diagonal jitter retried once if the covariance is singular
    #[arg(long)]
    pub jitter: Option<f64>,
}

impl SimulationOverrides {
    pub fn apply(&self, config: &mut AnalysisConfig) {
        let sim: &mut SimulationConfig = &mut config.simulation;
        if let Some(seed) = self.seed {
            sim.seed = Some(seed);
        }
        if let Some(n) = self.simulations {
            sim.num_simulations = n;
        }
        if let Some(h) = self.horizon {
            sim.time_horizon = h;
        }
        if let Some(j) = self.jitter {
            sim.diagonal_jitter = Some(j);
        }
        if let Some(rf) = self.risk_free_rate {
            sim.risk_free_rate = rf;
            config.risk.risk_free_rate = rf;
        }
    }
}
