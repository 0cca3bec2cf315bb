#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use portfolio_doctor_core::analysis::{AnalysisInput, MarketData};
use portfolio_doctor_core::{AnalysisConfig, Holding, PriceSeries, SectorMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Trading days in two years of daily data.
pub const TWO_YEARS: usize = 504;

pub fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

/// Seeded random-walk price series with a small positive drift.
pub fn random_walk(seed: u64, n: usize, start: f64, vol: f64) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = start;
    let mut prices = Vec::with_capacity(n);
    for _ in 0..n {
        prices.push(price);
        let shock: f64 = rng.gen_range(-1.0..1.0);
        price *= 1.0 + 0.0003 + vol * shock;
    }
    PriceSeries::new(dates(n), prices)
}

pub fn flat(n: usize, level: f64) -> PriceSeries {
    PriceSeries::new(dates(n), vec![level; n])
}

pub fn sectors(pairs: &[(&str, &str)]) -> SectorMap {
    pairs
        .iter()
        .map(|(t, s)| (t.to_string(), s.to_string()))
        .collect()
}

/// Analysis input where every ticker gets its own seeded random walk.
pub fn analysis_input(holdings: &[(&str, f64)], sector_pairs: &[(&str, &str)], n: usize) -> AnalysisInput {
    let prices: BTreeMap<String, PriceSeries> = holdings
        .iter()
        .enumerate()
        .map(|(i, (t, _))| (t.to_string(), random_walk(100 + i as u64, n, 50.0 + 10.0 * i as f64, 0.02)))
        .collect();
    AnalysisInput {
        holdings: holdings.iter().map(|(t, w)| Holding::new(*t, *w)).collect(),
        market_data: MarketData {
            prices,
            sectors: sectors(sector_pairs),
            benchmark: Some(random_walk(7, n, 4000.0, 0.01)),
        },
    }
}

/// Default configuration with a fixed seed and a small simulation.
pub fn seeded_config(seed: u64) -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.simulation.seed = Some(seed);
    config.simulation.num_simulations = 200;
    config.simulation.time_horizon = 63;
    config
}
