use chrono::{Duration, NaiveDate};
use clap::Args;
use serde_json::Value;

use portfolio_doctor_core::config::RiskConfig;
use portfolio_doctor_core::risk::{self, RiskMetricsInput};
use portfolio_doctor_core::ReturnSeries;

use super::read_payload;

/// Arguments for risk metrics
#[derive(Args)]
pub struct RiskArgs {
    /// Path to JSON file with dated portfolio and benchmark returns
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated periodic portfolio returns (e.g. "0.01,-0.02,0.005")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub returns: Option<Vec<f64>>,

    /// Comma-separated benchmark returns on the same periods as --returns
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub benchmark: Option<Vec<f64>>,

    /// Periods per year used for annualisation
    #[arg(long)]
    pub periods_per_year: Option<f64>,
}

/// `config` is the risk section of an explicit `--config` file. It replaces a
/// `config` embedded in the `--input` payload; without it the payload's own
/// assumptions (or the defaults) stand.
pub fn run_risk(
    args: RiskArgs,
    config: Option<RiskConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut payload: RiskMetricsInput = if let Some(returns) = args.returns {
        let benchmark = args.benchmark.unwrap_or_default();
        RiskMetricsInput {
            portfolio_returns: sequential(returns),
            benchmark_returns: sequential(benchmark),
            config: config.unwrap_or_default(),
        }
    } else {
        let mut from_file: RiskMetricsInput = read_payload(args.input.as_deref(), "risk metrics")?;
        if let Some(config) = config {
            from_file.config = config;
        }
        from_file
    };

    if let Some(p) = args.periods_per_year {
        payload.config.periods_per_year = p;
    }

    let result = risk::calculate_risk_metrics(&payload)?;
    Ok(serde_json::to_value(result)?)
}

/// Undated command-line returns stamped on consecutive days so that
/// portfolio and benchmark line up by position.
fn sequential(values: Vec<f64>) -> ReturnSeries {
    let epoch = NaiveDate::default();
    let dates = (0..values.len())
        .map(|i| epoch + Duration::days(i as i64))
        .collect();
    ReturnSeries::new(dates, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_file(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("pdoc-risk-{name}-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{
                "portfolio_returns": {"dates": ["2024-01-02", "2024-01-03", "2024-01-04"], "values": [0.01, -0.02, 0.015]},
                "benchmark_returns": {"dates": ["2024-01-02", "2024-01-03", "2024-01-04"], "values": [0.005, -0.01, 0.0075]},
                "config": {"risk_free_rate": 0.05, "periods_per_year": 12}
            }"#,
        )
        .unwrap();
        path
    }

    fn args(path: &std::path::Path) -> RiskArgs {
        RiskArgs {
            input: path.to_str().map(String::from),
            returns: None,
            benchmark: None,
            periods_per_year: None,
        }
    }

    #[test]
    fn test_embedded_config_kept_without_config_flag() {
        let path = payload_file("embedded");
        let out = run_risk(args(&path), None).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(out["assumptions"]["risk_free_rate"], 0.05);
        assert_eq!(out["assumptions"]["periods_per_year"], 12.0);
    }

    #[test]
    fn test_config_flag_replaces_embedded_config() {
        let path = payload_file("override");
        let explicit = RiskConfig {
            risk_free_rate: 0.01,
            ..Default::default()
        };
        let mut a = args(&path);
        a.periods_per_year = Some(52.0);
        let out = run_risk(a, Some(explicit)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(out["assumptions"]["risk_free_rate"], 0.01);
        assert_eq!(out["assumptions"]["periods_per_year"], 52.0);
    }

    #[test]
    fn test_inline_returns_use_defaults() {
        let a = RiskArgs {
            input: None,
            returns: Some(vec![0.01, -0.02, 0.015]),
            benchmark: Some(vec![0.005, -0.01, 0.0075]),
            periods_per_year: None,
        };
        let out = run_risk(a, None).unwrap();
        assert_eq!(out["assumptions"]["risk_free_rate"], RiskConfig::default().risk_free_rate);
        assert_eq!(out["assumptions"]["observations"], 3);
    }
}
