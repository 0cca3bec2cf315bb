use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::error::PortfolioDoctorError;
use crate::types::{PriceMatrix, PriceSeries};
use crate::PortfolioDoctorResult;

/// Align per-ticker price histories onto their common dates.
///
/// Only dates observed for every ticker are kept, so the resulting matrix
/// has no gaps. Columns follow the order of `tickers`; a ticker without a
/// history is rejected.
pub fn align_prices(
    tickers: &[String],
    histories: &BTreeMap<String, PriceSeries>,
) -> PortfolioDoctorResult<PriceMatrix> {
    if tickers.is_empty() {
        return Err(PortfolioDoctorError::InsufficientData(
            "No tickers to align".into(),
        ));
    }

    let mut selected = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let series = histories.get(ticker).ok_or_else(|| {
            PortfolioDoctorError::invalid(
                format!("prices[{ticker}]"),
                format!("No price history for ticker '{ticker}'"),
            )
        })?;
        series.validate(&format!("prices[{ticker}]"))?;
        selected.push(series);
    }

    let mut common: BTreeSet<NaiveDate> = selected[0].dates.iter().copied().collect();
    for series in &selected[1..] {
        let dates: BTreeSet<NaiveDate> = series.dates.iter().copied().collect();
        common = common.intersection(&dates).copied().collect();
    }
    let dates: Vec<NaiveDate> = common.into_iter().collect();

    let columns: Vec<Vec<f64>> = selected
        .iter()
        .map(|series| {
            let by_date: HashMap<NaiveDate, f64> = series
                .dates
                .iter()
                .copied()
                .zip(series.prices.iter().copied())
                .collect();
            dates.iter().map(|d| by_date[d]).collect()
        })
        .collect();

    debug!(
        tickers = tickers.len(),
        rows = dates.len(),
        "aligned price histories"
    );

    PriceMatrix::new(dates, tickers.to_vec(), columns)
}
