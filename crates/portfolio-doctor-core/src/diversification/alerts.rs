use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::AlertThresholds;
use crate::types::*;

/// Ordered warning messages raised by the threshold checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alerts {
    /// One entry per over-allocated sector, in sector-name order
    pub sector_alerts: Vec<String>,
    /// Position warnings in portfolio order, then at most one correlation warning
    pub overexposure_warnings: Vec<String>,
}

impl Alerts {
    pub fn is_empty(&self) -> bool {
        self.sector_alerts.is_empty() && self.overexposure_warnings.is_empty()
    }
}

/// Apply the sector, position and correlation thresholds.
pub fn generate_alerts(
    weights: &Weights,
    sector_allocation: &BTreeMap<String, Percent>,
    correlation: &CorrelationMatrix,
    thresholds: &AlertThresholds,
) -> Alerts {
    let sector_alerts = sector_allocation
        .iter()
        .filter(|(_, pct)| **pct > thresholds.sector_pct)
        .map(|(sector, pct)| format!("High exposure to {sector}: {pct:.1}%"))
        .collect();

    let mut overexposure_warnings: Vec<String> = weights
        .iter_percent()
        .filter(|(_, pct)| *pct > thresholds.position_pct)
        .map(|(ticker, pct)| format!("Single stock overexposure: {ticker} ({pct:.1}%)"))
        .collect();

    let pairs = correlated_pairs(correlation, thresholds.correlation);
    if !pairs.is_empty() {
        overexposure_warnings.push(correlated_pairs_message(&pairs, thresholds.max_listed_pairs));
    }

    Alerts {
        sector_alerts,
        overexposure_warnings,
    }
}

/// Upper-triangle ticker pairs whose correlation exceeds `threshold`,
/// in row-major ticker order. NaN entries never qualify.
pub fn correlated_pairs(correlation: &CorrelationMatrix, threshold: f64) -> Vec<(String, String)> {
    let tickers = correlation.tickers();
    let mut pairs = Vec::new();
    for i in 0..tickers.len() {
        for j in (i + 1)..tickers.len() {
            if correlation.get(i, j) > threshold {
                pairs.push((tickers[i].clone(), tickers[j].clone()));
            }
        }
    }
    pairs
}

fn correlated_pairs_message(pairs: &[(String, String)], max_listed: usize) -> String {
    let listed: Vec<String> = pairs
        .iter()
        .take(max_listed)
        .map(|(a, b)| format!("{a}-{b}"))
        .collect();
    let suffix = if pairs.len() > max_listed { "..." } else { "" };
    format!("Highly correlated pairs: {}{suffix}", listed.join(", "))
}
