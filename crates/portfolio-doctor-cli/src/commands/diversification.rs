use clap::Args;
use serde_json::Value;

use portfolio_doctor_core::analysis::{self, AnalysisInput};
use portfolio_doctor_core::AnalysisConfig;

use super::read_payload;

/// Arguments for diversification scoring and alerts
#[derive(Args)]
pub struct DiversifyArgs {
    /// Path to JSON input file (holdings + market_data; benchmark optional)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the single-position alert threshold (percent)
    #[arg(long)]
    pub position_pct: Option<f64>,

    /// Override the sector alert threshold (percent)
    #[arg(long)]
    pub sector_pct: Option<f64>,
}

pub fn run_diversify(
    args: DiversifyArgs,
    mut config: AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let payload: AnalysisInput = read_payload(args.input.as_deref(), "diversification")?;
    if let Some(p) = args.position_pct {
        config.alerts.position_pct = p;
    }
    if let Some(s) = args.sector_pct {
        config.alerts.sector_pct = s;
    }
    let result = analysis::assess_diversification(&payload, &config)?;
    Ok(serde_json::to_value(result)?)
}
