use nalgebra::DMatrix;
use portfolio_doctor_core::config::{DiversificationConfig, RiskConfig};
use portfolio_doctor_core::diversification::{compute_diversification, concentration_index};
use portfolio_doctor_core::risk::compute_risk_metrics;
use portfolio_doctor_core::stats::sanitize;
use portfolio_doctor_core::{CorrelationMatrix, ReturnSeries, SectorMap, Weights};
use proptest::prelude::*;

fn dated(values: Vec<f64>) -> ReturnSeries {
    let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let dates = (0..values.len())
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();
    ReturnSeries::new(dates, values)
}

proptest! {
    #[test]
    fn volatility_is_never_negative(returns in prop::collection::vec(-0.5f64..0.5, 0..200)) {
        let r = dated(returns);
        let m = compute_risk_metrics(&r, &r, &RiskConfig::default());
        prop_assert!(m.volatility >= 0.0);
        prop_assert!(m.max_drawdown <= 0.0);
        prop_assert!(m.beta.is_finite() && m.sharpe_ratio.is_finite() && m.var_95.is_finite());
    }

    #[test]
    fn equal_weights_concentration_is_one_over_n(n in 1usize..50) {
        let w = Weights::from_fractions((0..n).map(|i| (format!("T{i}"), 1.0 / n as f64)));
        let hhi = concentration_index(&w);
        prop_assert!((hhi - 1.0 / n as f64).abs() < 1e-12);
    }

    #[test]
    fn score_is_bounded(
        raw in prop::collection::vec(0.01f64..1.0, 1..12),
        corr in -1.0f64..1.0,
        sector_count in 1usize..4,
    ) {
        let total: f64 = raw.iter().sum();
        let n = raw.len();
        let tickers: Vec<String> = (0..n).map(|i| format!("T{i}")).collect();
        let weights = Weights::from_fractions(
            tickers.iter().cloned().zip(raw.iter().map(|w| w / total)),
        );
        let sectors: SectorMap = tickers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), format!("S{}", i % sector_count)))
            .collect();
        let matrix = DMatrix::from_fn(n, n, |i, j| if i == j { 1.0 } else { corr });
        let correlation = CorrelationMatrix::new(tickers, matrix).unwrap();

        let m = compute_diversification(&weights, &sectors, &correlation, &DiversificationConfig::default());
        prop_assert!((0.0..=100.0).contains(&m.score));
        prop_assert!(m.concentration_index > 0.0 && m.concentration_index <= 1.0 + 1e-12);
    }

    #[test]
    fn sanitize_passes_finite_values(x in prop::num::f64::NORMAL | prop::num::f64::ZERO, d in -10.0f64..10.0) {
        prop_assert_eq!(sanitize(x, d), x);
    }
}

#[test]
fn sanitize_replaces_non_finite() {
    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert_eq!(sanitize(bad, 0.5), 0.5);
    }
}
