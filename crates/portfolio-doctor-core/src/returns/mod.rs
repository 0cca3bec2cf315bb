pub mod alignment;
pub mod calculator;

pub use alignment::align_prices;
pub use calculator::{asset_returns, portfolio_returns, series_returns, AssetReturns};
