pub mod pipeline;

pub use pipeline::{
    analyze_portfolio, analyze_portfolio_with_rng, assess_diversification, simulate_portfolio,
    AnalysisInput, AnalysisResult, DiversificationReport, MarketData, VolatilityForecast,
};
