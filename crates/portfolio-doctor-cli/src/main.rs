mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analysis::AnalyzeArgs;
use commands::diversification::DiversifyArgs;
use commands::risk::RiskArgs;
use commands::simulation::SimulateArgs;

/// Portfolio risk, diversification and Monte Carlo analysis
#[derive(Parser)]
#[command(
    name = "pdoc",
    version,
    about = "Portfolio risk, diversification and Monte Carlo analysis",
    long_about = "A CLI for diagnosing a weighted portfolio from historical prices: \
                  beta, volatility, Sharpe, historical VaR, max drawdown, HHI and \
                  sector concentration, threshold alerts, and a correlated Monte Carlo \
                  simulation of forward returns."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Path to an analysis config file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis: risk, diversification, alerts and simulation
    Analyze(AnalyzeArgs),
    /// Risk metrics for a return series against a benchmark
    Risk(RiskArgs),
    /// Diversification score, sector allocation and alerts
    Diversify(DiversifyArgs),
    /// Monte Carlo simulation of portfolio returns
    Simulate(SimulateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analysis::run_analyze(args, config),
        Commands::Risk(args) => {
            let explicit = cli.config.is_some().then_some(config.risk);
            commands::risk::run_risk(args, explicit)
        }
        Commands::Diversify(args) => commands::diversification::run_diversify(args, config),
        Commands::Simulate(args) => commands::simulation::run_simulate(args, config),
        Commands::Version => {
            println!("pdoc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
