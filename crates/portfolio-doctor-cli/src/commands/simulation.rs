use clap::Args;
use serde_json::Value;

use portfolio_doctor_core::analysis::{self, AnalysisInput};
use portfolio_doctor_core::AnalysisConfig;

use super::{read_payload, SimulationOverrides};

/// Arguments for the Monte Carlo simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON input file (holdings + market_data; benchmark optional)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub simulation: SimulationOverrides,
}

pub fn run_simulate(
    args: SimulateArgs,
    mut config: AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let payload: AnalysisInput = read_payload(args.input.as_deref(), "Monte Carlo simulation")?;
    args.simulation.apply(&mut config);
    let result = analysis::simulate_portfolio(&payload, &config)?;
    Ok(serde_json::to_value(result)?)
}
