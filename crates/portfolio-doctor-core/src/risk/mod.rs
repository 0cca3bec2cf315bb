pub mod metrics;

pub use metrics::{calculate_risk_metrics, compute_risk_metrics, RiskMetrics, RiskMetricsInput};
