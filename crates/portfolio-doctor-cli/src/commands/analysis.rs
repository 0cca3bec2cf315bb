use clap::Args;
use serde_json::Value;

use portfolio_doctor_core::analysis::{self, AnalysisInput};
use portfolio_doctor_core::AnalysisConfig;

use super::{read_payload, SimulationOverrides};

/// Arguments for the full portfolio analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON input file (holdings + market_data)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub simulation: SimulationOverrides,
}

pub fn run_analyze(
    args: AnalyzeArgs,
    mut config: AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let payload: AnalysisInput = read_payload(args.input.as_deref(), "portfolio analysis")?;
    args.simulation.apply(&mut config);
    let result = analysis::analyze_portfolio(&payload, &config)?;
    Ok(serde_json::to_value(result)?)
}
