use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::DiversificationConfig;
use crate::stats::sanitize;
use crate::types::*;

/// Heuristic diversification profile of a weighted book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversificationMetrics {
    /// Bounded score in [0, 100]; higher is better diversified
    pub score: f64,
    /// Summed weight per sector, in percent, sorted by sector name
    pub sector_allocation: BTreeMap<String, Percent>,
    /// Herfindahl-Hirschman index of the fractional weights
    pub concentration_index: f64,
}

/// Sum the input percentages per sector label.
///
/// Tickers without a sector entry are grouped under [`UNKNOWN_SECTOR`].
pub fn sector_allocation(weights: &Weights, sectors: &SectorMap) -> BTreeMap<String, Percent> {
    let mut allocation = BTreeMap::new();
    for (ticker, pct) in weights.iter_percent() {
        let sector = sectors
            .get(ticker)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SECTOR);
        *allocation.entry(sector.to_string()).or_insert(0.0) += pct;
    }
    allocation
}

/// HHI: sum of squared fractional weights.
pub fn concentration_index(weights: &Weights) -> f64 {
    weights.iter().map(|(_, w)| w * w).sum()
}

/// Score the book from its concentration, sector skew and mean correlation.
///
/// `correlation` is the raw matrix: NaN entries from flat assets are left out
/// of the mean rather than counted as zero. The correlation penalty only
/// applies to books of at least two assets; a 1x1 correlation matrix is
/// trivially 1 and says nothing about co-movement.
pub fn compute_diversification(
    weights: &Weights,
    sectors: &SectorMap,
    correlation: &CorrelationMatrix,
    config: &DiversificationConfig,
) -> DiversificationMetrics {
    let allocation = sector_allocation(weights, sectors);
    let hhi = concentration_index(weights);

    let mut score = 100.0 - hhi * config.hhi_penalty;

    let max_sector = allocation
        .values()
        .map(|pct| pct / 100.0)
        .fold(0.0_f64, f64::max);
    if max_sector > config.sector_cap {
        score -= (max_sector - config.sector_cap) * config.sector_penalty;
    }

    let mean_corr = correlation.mean();
    if correlation.len() >= 2 && mean_corr > config.correlation_cutoff {
        score -= config.correlation_penalty;
    }

    let score = sanitize(score, 0.0).clamp(0.0, 100.0);
    debug!(score, hhi, max_sector, mean_corr, "computed diversification");

    DiversificationMetrics {
        score,
        sector_allocation: allocation,
        concentration_index: sanitize(hhi, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn identity_corr(tickers: &[&str]) -> CorrelationMatrix {
        let n = tickers.len();
        CorrelationMatrix::new(
            tickers.iter().map(|t| t.to_string()).collect(),
            DMatrix::identity(n, n),
        )
        .unwrap()
    }

    fn sectors(pairs: &[(&str, &str)]) -> SectorMap {
        pairs
            .iter()
            .map(|(t, s)| (t.to_string(), s.to_string()))
            .collect()
    }

    #[test]
    fn test_sector_allocation_in_percent_with_unknown() {
        let w = Weights::from_fractions([("AAA", 0.5), ("BBB", 0.3), ("CCC", 0.2)]);
        let alloc = sector_allocation(&w, &sectors(&[("AAA", "Tech"), ("BBB", "Tech")]));
        assert_relative_eq!(alloc["Tech"], 80.0, epsilon = 1e-9);
        assert_relative_eq!(alloc[UNKNOWN_SECTOR], 20.0, epsilon = 1e-9);
        assert_eq!(alloc.len(), 2);
    }

    #[test]
    fn test_equal_weights_hhi() {
        let w = Weights::from_fractions([("A", 0.25), ("B", 0.25), ("C", 0.25), ("D", 0.25)]);
        assert_relative_eq!(concentration_index(&w), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_score_with_all_penalties() {
        // hhi = 0.5, max sector = 1.0, mean corr = 1.0
        let w = Weights::from_fractions([("A", 0.5), ("B", 0.5)]);
        let corr = CorrelationMatrix::new(
            vec!["A".into(), "B".into()],
            DMatrix::from_element(2, 2, 1.0),
        )
        .unwrap();
        let m = compute_diversification(
            &w,
            &sectors(&[("A", "Tech"), ("B", "Tech")]),
            &corr,
            &DiversificationConfig::default(),
        );
        // 100 - 25 - 60 - 20
        assert_relative_eq!(m.score, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_score_without_penalties_beyond_hhi() {
        let w = Weights::from_fractions([("A", 0.25), ("B", 0.25), ("C", 0.25), ("D", 0.25)]);
        let m = compute_diversification(
            &w,
            &sectors(&[("A", "Tech"), ("B", "Energy"), ("C", "Health"), ("D", "Utilities")]),
            &identity_corr(&["A", "B", "C", "D"]),
            &DiversificationConfig::default(),
        );
        assert_relative_eq!(m.score, 87.5, epsilon = 1e-9);
        assert_relative_eq!(m.concentration_index, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_single_asset_skips_correlation_penalty() {
        let w = Weights::from_fractions([("A", 1.0)]);
        let m = compute_diversification(
            &w,
            &SectorMap::new(),
            &identity_corr(&["A"]),
            &DiversificationConfig::default(),
        );
        // 100 - 50 (hhi) - 60 (sector skew) clamps to 0
        assert_eq!(m.score, 0.0);

        let lenient = DiversificationConfig {
            sector_cap: 1.0,
            ..Default::default()
        };
        let m = compute_diversification(&w, &SectorMap::new(), &identity_corr(&["A"]), &lenient);
        assert_relative_eq!(m.score, 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nan_correlations_are_skipped_in_the_mean() {
        // Column B is all NaN and drops out; column A averages to 1.
        let w = Weights::from_fractions([("A", 0.5), ("B", 0.5)]);
        let corr = CorrelationMatrix::new(
            vec!["A".into(), "B".into()],
            DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, f64::NAN, f64::NAN]),
        )
        .unwrap();
        let lenient = DiversificationConfig {
            sector_cap: 1.0,
            ..Default::default()
        };
        let m = compute_diversification(&w, &SectorMap::new(), &corr, &lenient);
        // 100 - 25 (hhi) - 20 (correlation)
        assert_relative_eq!(m.score, 55.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_asset_does_not_dilute_correlation_penalty() {
        // A and B move together, C is flat: pandas-style mean is 1.0
        let w = Weights::from_fractions([("A", 1.0 / 3.0), ("B", 1.0 / 3.0), ("C", 1.0 / 3.0)]);
        let corr = CorrelationMatrix::new(
            vec!["A".into(), "B".into(), "C".into()],
            DMatrix::from_row_slice(
                3,
                3,
                &[
                    1.0, 1.0, f64::NAN, //
                    1.0, 1.0, f64::NAN, //
                    f64::NAN, f64::NAN, f64::NAN,
                ],
            ),
        )
        .unwrap();
        let m = compute_diversification(
            &w,
            &sectors(&[("A", "Tech"), ("B", "Energy"), ("C", "Health")]),
            &corr,
            &DiversificationConfig::default(),
        );
        // 100 - 50/3 (hhi) - 20 (correlation)
        assert_relative_eq!(m.score, 100.0 - 50.0 / 3.0 - 20.0, epsilon = 1e-9);
    }
}
