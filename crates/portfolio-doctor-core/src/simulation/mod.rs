pub mod cholesky;
pub mod monte_carlo;

pub use cholesky::{cholesky_factor, PIVOT_TOLERANCE};
pub use monte_carlo::{
    run_monte_carlo, run_monte_carlo_with_rng, summarize, SimulationModel, SimulationResult,
};
