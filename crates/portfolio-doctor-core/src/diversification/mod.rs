pub mod alerts;
pub mod scoring;

pub use alerts::{correlated_pairs, generate_alerts, Alerts};
pub use scoring::{compute_diversification, concentration_index, sector_allocation, DiversificationMetrics};
