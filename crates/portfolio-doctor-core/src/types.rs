use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::PortfolioDoctorError;
use crate::PortfolioDoctorResult;

/// Weights as fractions of one (0.25 = 25%). Never as percentages.
pub type Fraction = f64;

/// Weights and allocations as percentages (25.0 = 25%). Display and input only.
pub type Percent = f64;

/// Sector label per ticker. Tickers without an entry fall into [`UNKNOWN_SECTOR`].
pub type SectorMap = BTreeMap<String, String>;

/// Sector used for tickers missing from a [`SectorMap`].
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Allowed distance of the total portfolio weight from 100%.
pub const WEIGHT_SUM_TOLERANCE: Percent = 1.0;

/// A single position, weighted in percent of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub weight: Percent,
}

impl Holding {
    pub fn new(ticker: impl Into<String>, weight: Percent) -> Self {
        Self {
            ticker: ticker.into(),
            weight,
        }
    }
}

/// Ordered set of holdings. Order is preserved through every computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }

    pub fn tickers(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.ticker.clone()).collect()
    }

    pub fn total_weight(&self) -> Percent {
        self.holdings.iter().map(|h| h.weight).sum()
    }

    /// Boundary checks: non-empty, unique tickers, each weight in (0, 100],
    /// total within [`WEIGHT_SUM_TOLERANCE`] of 100.
    pub fn validate(&self) -> PortfolioDoctorResult<()> {
        if self.holdings.is_empty() {
            return Err(PortfolioDoctorError::InsufficientData(
                "Portfolio must contain at least one holding".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.holdings.len());
        for (i, h) in self.holdings.iter().enumerate() {
            if h.ticker.trim().is_empty() {
                return Err(PortfolioDoctorError::invalid(
                    format!("holdings[{i}].ticker"),
                    "Ticker must not be empty",
                ));
            }
            if !seen.insert(h.ticker.as_str()) {
                return Err(PortfolioDoctorError::invalid(
                    format!("holdings[{i}].ticker"),
                    format!("Duplicate ticker '{}'", h.ticker),
                ));
            }
            if !h.weight.is_finite() || h.weight <= 0.0 || h.weight > 100.0 {
                return Err(PortfolioDoctorError::invalid(
                    format!("holdings[{i}].weight"),
                    format!("Weight must be in (0, 100], got {}", h.weight),
                ));
            }
        }

        let total = self.total_weight();
        if (total - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PortfolioDoctorError::invalid(
                "holdings",
                format!("Weights must sum to 100% (±{WEIGHT_SUM_TOLERANCE}), got {total:.2}%"),
            ));
        }

        Ok(())
    }
}

/// Fractional weights in portfolio order.
///
/// This is the only representation the engines consume; percentages are
/// converted once in [`Weights::from_portfolio`]. The input percentages are
/// kept alongside so that sector totals and threshold checks see the same
/// numbers the caller sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    entries: Vec<WeightEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WeightEntry {
    ticker: String,
    fraction: Fraction,
    percent: Percent,
}

impl Weights {
    pub fn from_portfolio(portfolio: &Portfolio) -> Self {
        Self {
            entries: portfolio
                .holdings
                .iter()
                .map(|h| WeightEntry {
                    ticker: h.ticker.clone(),
                    fraction: h.weight / 100.0,
                    percent: h.weight,
                })
                .collect(),
        }
    }

    /// Weights given directly as fractions; percentages are derived.
    pub fn from_fractions<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Fraction)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(t, w)| WeightEntry {
                    ticker: t.into(),
                    fraction: w,
                    percent: w * 100.0,
                })
                .collect(),
        }
    }

    /// Weight of `ticker`, zero when it is not held.
    pub fn get(&self, ticker: &str) -> Fraction {
        self.entries
            .iter()
            .find(|e| e.ticker == ticker)
            .map(|e| e.fraction)
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Fraction)> {
        self.entries.iter().map(|e| (e.ticker.as_str(), e.fraction))
    }

    /// Weights in percent, exactly as they were supplied.
    pub fn iter_percent(&self) -> impl Iterator<Item = (&str, Percent)> {
        self.entries.iter().map(|e| (e.ticker.as_str(), e.percent))
    }

    /// Weight vector in the column order of `tickers`.
    pub fn aligned(&self, tickers: &[String]) -> DVector<f64> {
        DVector::from_iterator(tickers.len(), tickers.iter().map(|t| self.get(t)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A dated, chronological price series for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new(dates: Vec<NaiveDate>, prices: Vec<f64>) -> Self {
        Self { dates, prices }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn validate(&self, field: &str) -> PortfolioDoctorResult<()> {
        if self.dates.len() != self.prices.len() {
            return Err(PortfolioDoctorError::DimensionMismatch {
                context: field.to_string(),
                expected: self.dates.len(),
                actual: self.prices.len(),
            });
        }
        validate_dates(&self.dates, field)?;
        validate_prices(&self.prices, field)
    }
}

/// Ticker-indexed prices on one shared, gap-free date domain.
///
/// Rows are dates, columns are tickers.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: DMatrix<f64>,
}

impl PriceMatrix {
    /// Build from one price column per ticker, each aligned to `dates`.
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> PortfolioDoctorResult<Self> {
        if tickers.is_empty() {
            return Err(PortfolioDoctorError::InsufficientData(
                "Price matrix needs at least one ticker".into(),
            ));
        }
        if tickers.len() != columns.len() {
            return Err(PortfolioDoctorError::DimensionMismatch {
                context: "price matrix columns".into(),
                expected: tickers.len(),
                actual: columns.len(),
            });
        }
        let mut seen = HashSet::with_capacity(tickers.len());
        for t in &tickers {
            if !seen.insert(t.as_str()) {
                return Err(PortfolioDoctorError::invalid(
                    "prices",
                    format!("Duplicate ticker '{t}'"),
                ));
            }
        }
        validate_dates(&dates, "prices.dates")?;
        for (t, col) in tickers.iter().zip(&columns) {
            if col.len() != dates.len() {
                return Err(PortfolioDoctorError::DimensionMismatch {
                    context: format!("prices[{t}]"),
                    expected: dates.len(),
                    actual: col.len(),
                });
            }
            validate_prices(col, &format!("prices[{t}]"))?;
        }

        let values = DMatrix::from_fn(dates.len(), tickers.len(), |i, j| columns[j][i]);
        Ok(Self {
            dates,
            tickers,
            values,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn num_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_assets(&self) -> usize {
        self.values.ncols()
    }

    pub fn column(&self, ticker: &str) -> Option<Vec<f64>> {
        let j = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.values.column(j).iter().copied().collect())
    }
}

/// Fractional periodic returns; `values[t] = price[t+1] / price[t] - 1`
/// stamped with the later date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        Self { dates, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Symmetric ticker-indexed correlation matrix.
///
/// Entries for a zero-variance asset are NaN; [`CorrelationMatrix::to_map`]
/// reports them as 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    tickers: Vec<String>,
    values: DMatrix<f64>,
}

impl CorrelationMatrix {
    pub fn new(tickers: Vec<String>, values: DMatrix<f64>) -> PortfolioDoctorResult<Self> {
        check_square(&tickers, &values, "correlation matrix")?;
        Ok(Self { tickers, values })
    }

    /// Caller guarantees `values` is `tickers.len()` square.
    pub(crate) fn from_square(tickers: Vec<String>, values: DMatrix<f64>) -> Self {
        debug_assert_eq!(values.shape(), (tickers.len(), tickers.len()));
        Self { tickers, values }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    /// Mean of the per-column means, diagonal included.
    ///
    /// Non-finite entries are skipped, and so is a column with no finite
    /// entry at all. NaN when nothing is finite.
    pub fn mean(&self) -> f64 {
        let column_means: Vec<f64> = self
            .values
            .column_iter()
            .filter_map(|col| {
                let finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
                (!finite.is_empty()).then(|| crate::stats::mean(&finite))
            })
            .collect();
        crate::stats::mean(&column_means)
    }

    /// Mapping-of-mappings keyed by ticker, non-finite entries as 0.0.
    pub fn to_map(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        self.tickers
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let inner = self
                    .tickers
                    .iter()
                    .enumerate()
                    .map(|(j, col)| (col.clone(), crate::stats::sanitize(self.values[(i, j)], 0.0)))
                    .collect();
                (row.clone(), inner)
            })
            .collect()
    }
}

/// Symmetric ticker-indexed covariance matrix of periodic returns.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceMatrix {
    tickers: Vec<String>,
    values: DMatrix<f64>,
}

impl CovarianceMatrix {
    pub fn new(tickers: Vec<String>, values: DMatrix<f64>) -> PortfolioDoctorResult<Self> {
        check_square(&tickers, &values, "covariance matrix")?;
        Ok(Self { tickers, values })
    }

    /// Caller guarantees `values` is `tickers.len()` square.
    pub(crate) fn from_square(tickers: Vec<String>, values: DMatrix<f64>) -> Self {
        debug_assert_eq!(values.shape(), (tickers.len(), tickers.len()));
        Self { tickers, values }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Copy with `jitter` added to every diagonal entry.
    pub fn with_diagonal_jitter(&self, jitter: f64) -> Self {
        let n = self.tickers.len();
        Self {
            tickers: self.tickers.clone(),
            values: &self.values + DMatrix::<f64>::identity(n, n) * jitter,
        }
    }
}

fn check_square(tickers: &[String], values: &DMatrix<f64>, context: &str) -> PortfolioDoctorResult<()> {
    if values.nrows() != values.ncols() {
        return Err(PortfolioDoctorError::DimensionMismatch {
            context: context.to_string(),
            expected: values.nrows(),
            actual: values.ncols(),
        });
    }
    if tickers.len() != values.nrows() {
        return Err(PortfolioDoctorError::DimensionMismatch {
            context: context.to_string(),
            expected: tickers.len(),
            actual: values.nrows(),
        });
    }
    Ok(())
}

fn validate_dates(dates: &[NaiveDate], field: &str) -> PortfolioDoctorResult<()> {
    if dates.windows(2).any(|w| w[0] >= w[1]) {
        return Err(PortfolioDoctorError::invalid(
            field,
            "Dates must be strictly increasing",
        ));
    }
    Ok(())
}

fn validate_prices(prices: &[f64], field: &str) -> PortfolioDoctorResult<()> {
    if let Some(p) = prices.iter().find(|p| !p.is_finite() || **p <= 0.0) {
        return Err(PortfolioDoctorError::invalid(
            field,
            format!("Prices must be finite and positive, got {p}"),
        ));
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_validate_accepts_rounding_tolerance() {
        let p = Portfolio::new(vec![Holding::new("A", 33.3), Holding::new("B", 33.3), Holding::new("C", 33.3)]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sum() {
        let p = Portfolio::new(vec![Holding::new("A", 50.0), Holding::new("B", 48.5)]);
        assert!(matches!(
            p.validate(),
            Err(PortfolioDoctorError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_zero_weight() {
        let dup = Portfolio::new(vec![Holding::new("A", 50.0), Holding::new("A", 50.0)]);
        assert!(dup.validate().is_err());
        let zero = Portfolio::new(vec![Holding::new("A", 100.0), Holding::new("B", 0.0)]);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(
            Portfolio::default().validate(),
            Err(PortfolioDoctorError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_weights_are_fractions() {
        let p = Portfolio::new(vec![Holding::new("A", 60.0), Holding::new("B", 40.0)]);
        let w = Weights::from_portfolio(&p);
        assert_eq!(w.get("A"), 0.6);
        assert_eq!(w.get("B"), 0.4);
        assert_eq!(w.get("C"), 0.0);
        let aligned = w.aligned(&["B".to_string(), "C".to_string(), "A".to_string()]);
        assert_eq!(aligned.as_slice(), &[0.4, 0.0, 0.6]);
    }

    #[test]
    fn test_weights_keep_input_percentages() {
        let p = Portfolio::new(vec![Holding::new("A", 10.4), Holding::new("B", 89.6)]);
        let w = Weights::from_portfolio(&p);
        let pct: Vec<(&str, Percent)> = w.iter_percent().collect();
        assert_eq!(pct, vec![("A", 10.4), ("B", 89.6)]);
    }

    #[test]
    fn test_price_matrix_rejects_non_positive_price() {
        let res = PriceMatrix::new(
            vec![d(1), d(2)],
            vec!["A".into()],
            vec![vec![10.0, 0.0]],
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_price_matrix_rejects_unsorted_dates() {
        let res = PriceMatrix::new(
            vec![d(2), d(1)],
            vec!["A".into()],
            vec![vec![10.0, 11.0]],
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_price_matrix_layout() {
        let m = PriceMatrix::new(
            vec![d(1), d(2), d(3)],
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]],
        )
        .unwrap();
        assert_eq!(m.num_rows(), 3);
        assert_eq!(m.num_assets(), 2);
        assert_eq!(m.values()[(2, 1)], 30.0);
        assert_eq!(m.column("B"), Some(vec![10.0, 20.0, 30.0]));
    }

    #[test]
    fn test_correlation_map_sanitizes() {
        let values = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, f64::NAN, f64::NAN]);
        let corr = CorrelationMatrix::new(vec!["A".into(), "B".into()], values).unwrap();
        let map = corr.to_map();
        assert_eq!(map["A"]["A"], 1.0);
        assert_eq!(map["A"]["B"], 0.0);
        assert_eq!(map["B"]["B"], 0.0);
    }

    #[test]
    fn test_covariance_jitter_only_touches_diagonal() {
        let values = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 1.0]);
        let cov = CovarianceMatrix::new(vec!["A".into(), "B".into()], values).unwrap();
        let j = cov.with_diagonal_jitter(0.1);
        assert_eq!(j.values()[(0, 0)], 1.1);
        assert_eq!(j.values()[(0, 1)], 0.5);
    }
}
