//! Risk and correlation metrics — pure functions over daily return series.
//!
//! Standard deviations are sample statistics (n - 1 denominator) everywhere,
//! so Sharpe ratios are comparable across instruments and match the usual
//! dataframe and statistics-library conventions.

use serde::{Deserialize, Serialize};
use sharpelab_core::ReturnTable;
use thiserror::Error;

/// Volatility below this is treated as zero.
const ZERO_VOL: f64 = 1e-15;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("benchmark '{0}' is not a column of the return table")]
    BenchmarkMissing(String),
}

/// Sharpe ratio of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharpeEntry {
    pub ticker: String,
    pub sharpe: f64,
}

/// Trailing-window correlation of one instrument against the benchmark,
/// aligned index-for-index with the return table's dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingCorrelation {
    pub ticker: String,
    pub benchmark: String,
    pub window: usize,
    pub values: Vec<f64>,
}

/// Everything the metrics stage produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub daily_risk_free_rate: f64,
    pub sharpe: Vec<SharpeEntry>,
    pub correlation: CorrelationMatrix,
    pub rolling: Vec<RollingCorrelation>,
}

impl RiskMetrics {
    /// Compute Sharpe ratios, the full correlation matrix, and one rolling
    /// correlation per non-benchmark ticker.
    pub fn compute(
        returns: &ReturnTable,
        benchmark: &str,
        annual_risk_free_rate: f64,
        periods_per_year: f64,
        window: usize,
    ) -> Result<Self, MetricsError> {
        let bench = returns
            .column(benchmark)
            .ok_or_else(|| MetricsError::BenchmarkMissing(benchmark.to_string()))?;

        let rf = daily_risk_free_rate(annual_risk_free_rate, periods_per_year);

        let sharpe = returns
            .iter_columns()
            .map(|(ticker, column)| SharpeEntry {
                ticker: ticker.to_string(),
                sharpe: sharpe_ratio(column, rf, periods_per_year),
            })
            .collect();

        let rolling = returns
            .iter_columns()
            .filter(|(ticker, _)| *ticker != benchmark)
            .map(|(ticker, column)| RollingCorrelation {
                ticker: ticker.to_string(),
                benchmark: benchmark.to_string(),
                window,
                values: rolling_correlation(column, bench, window),
            })
            .collect();

        Ok(Self {
            daily_risk_free_rate: rf,
            sharpe,
            correlation: CorrelationMatrix::compute(returns),
            rolling,
        })
    }

    pub fn sharpe_for(&self, ticker: &str) -> Option<f64> {
        self.sharpe
            .iter()
            .find(|e| e.ticker == ticker)
            .map(|e| e.sharpe)
    }
}

/// Pairwise Pearson correlations over the full return history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    /// Row-major, `values[i][j]` = corr(tickers[i], tickers[j]).
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn compute(returns: &ReturnTable) -> Self {
        let columns: Vec<&[f64]> = returns.iter_columns().map(|(_, c)| c).collect();
        let n = columns.len();
        let mut values = vec![vec![f64::NAN; n]; n];

        for i in 0..n {
            // A column correlates perfectly with itself unless it has no variance.
            values[i][i] = if sample_std(columns[i]) >= ZERO_VOL {
                1.0
            } else {
                f64::NAN
            };
            for j in (i + 1)..n {
                let r = pearson(columns[i], columns[j]);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        Self {
            tickers: returns.tickers().to_vec(),
            values,
        }
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        Some(self.values[i][j])
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Daily rate equivalent to a nominal annual rate under daily compounding.
pub fn daily_risk_free_rate(annual_rate: f64, periods_per_year: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / periods_per_year) - 1.0
}

/// Annualized Sharpe ratio of daily returns.
///
/// Sharpe = mean(r - rf) * P / (std(r - rf) * sqrt(P)).
/// NaN when there are fewer than two returns or the excess returns have no
/// volatility.
pub fn sharpe_ratio(returns: &[f64], daily_rf: f64, periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let std = sample_std(&excess);
    if std.is_nan() || std < ZERO_VOL {
        return f64::NAN;
    }
    let annualized_return = mean(&excess) * periods_per_year;
    let annualized_std = std * periods_per_year.sqrt();
    annualized_return / annualized_std
}

/// Pearson correlation of two equal-length series.
///
/// NaN when the lengths differ, there are fewer than two points, any value is
/// non-finite, or either series has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom_n = (x.len() - 1) as f64;
    let (sx, sy) = ((sxx / denom_n).sqrt(), (syy / denom_n).sqrt());
    if sx.is_nan() || sy.is_nan() || sx < ZERO_VOL || sy < ZERO_VOL {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Trailing-window Pearson correlation.
///
/// Output has the same length as the inputs. Index `i` covers observations
/// `i + 1 - window ..= i`; the first `window - 1` values are NaN.
pub fn rolling_correlation(x: &[f64], y: &[f64], window: usize) -> Vec<f64> {
    let n = x.len().min(y.len());
    let mut out = vec![f64::NAN; n];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..n {
        let lo = i + 1 - window;
        out[i] = pearson(&x[lo..=i], &y[lo..=i]);
    }
    out
}

/// Growth of one unit: running product of `1 + r`.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0_f64, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(columns: Vec<(&str, Vec<f64>)>) -> ReturnTable {
        let n = columns[0].1.len();
        let start = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let dates = (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect();
        let (tickers, cols): (Vec<String>, Vec<Vec<f64>>) = columns
            .into_iter()
            .map(|(t, c)| (t.to_string(), c))
            .unzip();
        ReturnTable::new(dates, tickers, cols).unwrap()
    }

    fn wave(n: usize, phase: f64, scale: f64) -> Vec<f64> {
        (0..n)
            .map(|i| scale * ((i as f64) * 0.7 + phase).sin() + 0.0005)
            .collect()
    }

    // ── Risk-free rate ──

    #[test]
    fn daily_rf_compounds_back_to_annual() {
        let daily = daily_risk_free_rate(0.02, 252.0);
        assert!(((1.0 + daily).powf(252.0) - 1.02).abs() < 1e-12);
        assert!(daily < 0.02 / 252.0);
        assert_eq!(daily_risk_free_rate(0.0, 252.0), 0.0);
    }

    // ── Sharpe ──

    #[test]
    fn sharpe_known_value() {
        let r: [f64; 4] = [0.01, -0.005, 0.002, 0.007];
        let m: f64 = (0.01 - 0.005 + 0.002 + 0.007) / 4.0;
        let var = r.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 3.0;
        let expected = m * 252.0 / (var.sqrt() * 252f64.sqrt());
        assert!((sharpe_ratio(&r, 0.0, 252.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn sharpe_subtracts_risk_free() {
        let r = wave(100, 0.0, 0.01);
        let with_rf = sharpe_ratio(&r, 0.0001, 252.0);
        let without = sharpe_ratio(&r, 0.0, 252.0);
        assert!(with_rf < without);
    }

    #[test]
    fn sharpe_constant_returns_is_nan() {
        assert!(sharpe_ratio(&[0.001; 50], 0.0, 252.0).is_nan());
    }

    #[test]
    fn sharpe_too_short_is_nan() {
        assert!(sharpe_ratio(&[0.01], 0.0, 252.0).is_nan());
        assert!(sharpe_ratio(&[], 0.0, 252.0).is_nan());
    }

    // ── Pearson ──

    #[test]
    fn pearson_perfect_and_inverse() {
        let x = wave(40, 0.0, 0.01);
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 0.003).collect();
        let z: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &z) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_degenerate_is_nan() {
        assert!(pearson(&[0.001; 10], &wave(10, 0.0, 0.01)).is_nan());
        assert!(pearson(&[0.1, 0.2], &[0.1]).is_nan());
        assert!(pearson(&[0.1, f64::NAN, 0.3], &[0.1, 0.2, 0.3]).is_nan());
    }

    // ── Rolling correlation ──

    #[test]
    fn rolling_undefined_before_full_window() {
        let x = wave(60, 0.0, 0.01);
        let y = wave(60, 0.4, 0.02);
        let rc = rolling_correlation(&x, &y, 30);
        assert_eq!(rc.len(), 60);
        assert!(rc[..29].iter().all(|v| v.is_nan()));
        assert!(rc[29..].iter().all(|v| v.is_finite() && (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn rolling_matches_pearson_on_trailing_slice() {
        let x = wave(50, 0.0, 0.01);
        let y = wave(50, 1.1, 0.01);
        let rc = rolling_correlation(&x, &y, 30);
        assert_eq!(rc[45], pearson(&x[16..46], &y[16..46]));
    }

    #[test]
    fn rolling_shorter_than_window_is_all_nan() {
        let rc = rolling_correlation(&[0.1, 0.2], &[0.2, 0.1], 30);
        assert!(rc.iter().all(|v| v.is_nan()));
    }

    // ── Cumulative returns ──

    #[test]
    fn cumulative_is_running_product() {
        let c = cumulative_returns(&[0.1, -0.5, 0.2]);
        assert!((c[0] - 1.1).abs() < 1e-12);
        assert!((c[1] - 0.55).abs() < 1e-12);
        assert!((c[2] - 0.66).abs() < 1e-12);
        assert!(cumulative_returns(&[]).is_empty());
    }

    // ── Matrix and aggregate ──

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let returns = table(vec![
            ("AMZN", wave(80, 0.0, 0.02)),
            ("META", wave(80, 0.9, 0.03)),
            ("^GSPC", wave(80, 0.3, 0.01)),
        ]);
        let m = CorrelationMatrix::compute(&returns);
        for i in 0..3 {
            assert_eq!(m.values[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
        }
        assert_eq!(m.get("AMZN", "^GSPC"), m.get("^GSPC", "AMZN"));
        assert_eq!(m.get("AMZN", "NOPE"), None);
    }

    #[test]
    fn compute_builds_rolling_for_non_benchmark_only() {
        let returns = table(vec![
            ("AMZN", wave(40, 0.0, 0.02)),
            ("META", wave(40, 0.9, 0.03)),
            ("^GSPC", wave(40, 0.3, 0.01)),
        ]);
        let metrics = RiskMetrics::compute(&returns, "^GSPC", 0.02, 252.0, 30).unwrap();

        assert_eq!(metrics.sharpe.len(), 3);
        let tickers: Vec<&str> = metrics.rolling.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AMZN", "META"]);
        assert!(metrics.rolling.iter().all(|r| r.values.len() == 40));
        assert!(metrics.sharpe_for("META").is_some());
    }

    #[test]
    fn compute_requires_benchmark_column() {
        let returns = table(vec![("AMZN", wave(40, 0.0, 0.02))]);
        let err = RiskMetrics::compute(&returns, "^GSPC", 0.02, 252.0, 30).unwrap_err();
        assert_eq!(err, MetricsError::BenchmarkMissing("^GSPC".into()));
    }
}
