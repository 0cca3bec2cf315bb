pub mod config;
pub mod error;
pub mod stats;
pub mod types;

#[cfg(feature = "returns")]
pub mod returns;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "diversification")]
pub mod diversification;

#[cfg(feature = "simulation")]
pub mod simulation;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use config::AnalysisConfig;
pub use error::PortfolioDoctorError;
pub use types::*;

/// Standard result type for all portfolio-doctor operations
pub type PortfolioDoctorResult<T> = Result<T, PortfolioDoctorError>;
