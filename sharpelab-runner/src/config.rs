//! Analysis configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! gives the standard run: AMZN and META against the S&P 500 from
//! 2020-01-01 to 2025-06-24 with a 2% annual risk-free rate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub analysis: AnalysisSection,
    pub output: OutputSection,
}

/// What to fetch and how to measure it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// Tickers to fetch, benchmark included. Names are used verbatim as
    /// table columns.
    pub tickers: Vec<String>,
    /// Ticker every other instrument is correlated against.
    pub benchmark: String,
    /// Display name of the benchmark in chart titles and legends.
    pub benchmark_label: String,
    /// First date (inclusive).
    pub start_date: NaiveDate,
    /// Last date (inclusive).
    pub end_date: NaiveDate,
    /// Nominal annual risk-free rate, e.g. 0.02 for 2%.
    pub annual_risk_free_rate: f64,
    /// Trailing window, in observations, for rolling correlation.
    pub rolling_window: usize,
    /// Annualization factor.
    pub trading_days_per_year: f64,
}

/// Where results are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub database: PathBuf,
    pub table: String,
    pub cleaned_csv: PathBuf,
    pub cumulative_returns_plot: PathBuf,
    pub rolling_correlations_plot: PathBuf,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            tickers: vec!["AMZN".into(), "META".into(), "^GSPC".into()],
            benchmark: "^GSPC".into(),
            benchmark_label: "S&P 500".into(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 24).unwrap_or_default(),
            annual_risk_free_rate: 0.02,
            rolling_window: 30,
            trading_days_per_year: 252.0,
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            database: PathBuf::from("data/stock_data.db"),
            table: "raw_stock_prices".into(),
            cleaned_csv: PathBuf::from("data/cleaned_stock_prices.csv"),
            cumulative_returns_plot: PathBuf::from("plots/cumulative_returns.svg"),
            rolling_correlations_plot: PathBuf::from("plots/rolling_correlations.svg"),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        if a.tickers.is_empty() {
            return Err(ConfigError::Invalid("tickers must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for ticker in &a.tickers {
            if ticker.trim().is_empty() {
                return Err(ConfigError::Invalid("ticker names must not be blank".into()));
            }
            if !seen.insert(ticker.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate ticker '{ticker}'")));
            }
        }
        if !a.tickers.contains(&a.benchmark) {
            return Err(ConfigError::Invalid(format!(
                "benchmark '{}' is not in tickers",
                a.benchmark
            )));
        }
        if a.start_date > a.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                a.start_date, a.end_date
            )));
        }
        if a.rolling_window < 2 {
            return Err(ConfigError::Invalid(
                "rolling_window must be at least 2".into(),
            ));
        }
        if !(a.trading_days_per_year.is_finite() && a.trading_days_per_year > 0.0) {
            return Err(ConfigError::Invalid(
                "trading_days_per_year must be positive".into(),
            ));
        }
        if !(a.annual_risk_free_rate.is_finite() && a.annual_risk_free_rate > -1.0) {
            return Err(ConfigError::Invalid(
                "annual_risk_free_rate must be greater than -1".into(),
            ));
        }
        if self.output.table.trim().is_empty() {
            return Err(ConfigError::Invalid("output table name must not be blank".into()));
        }
        Ok(())
    }

    /// Tickers other than the benchmark, in configured order.
    pub fn non_benchmark_tickers(&self) -> impl Iterator<Item = &str> {
        self.analysis
            .tickers
            .iter()
            .map(String::as_str)
            .filter(move |t| *t != self.analysis.benchmark)
    }

    /// Every file path the run writes to.
    pub fn output_paths(&self) -> [&Path; 4] {
        [
            self.output.database.as_path(),
            self.output.cleaned_csv.as_path(),
            self.output.cumulative_returns_plot.as_path(),
            self.output.rolling_correlations_plot.as_path(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_standard_run() {
        let config = AnalysisConfig::from_toml("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.analysis.tickers, vec!["AMZN", "META", "^GSPC"]);
        assert_eq!(config.analysis.rolling_window, 30);
        assert_eq!(config.output.table, "raw_stock_prices");
        assert_eq!(
            config.non_benchmark_tickers().collect::<Vec<_>>(),
            vec!["AMZN", "META"]
        );
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = AnalysisConfig::from_toml(
            r#"
[analysis]
tickers = ["SPY", "QQQ"]
benchmark = "SPY"
start_date = "2022-01-03"
annual_risk_free_rate = 0.0

[output]
cleaned_csv = "out/clean.csv"
"#,
        )
        .unwrap();

        assert_eq!(config.analysis.benchmark, "SPY");
        assert_eq!(
            config.analysis.start_date,
            NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
        );
        assert_eq!(config.analysis.annual_risk_free_rate, 0.0);
        assert_eq!(config.analysis.rolling_window, 30);
        assert_eq!(config.output.cleaned_csv, PathBuf::from("out/clean.csv"));
        assert_eq!(config.output.table, "raw_stock_prices");
    }

    #[test]
    fn benchmark_must_be_tracked() {
        let err = AnalysisConfig::from_toml(
            r#"
[analysis]
tickers = ["AMZN", "META"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("benchmark")));
    }

    #[test]
    fn rejects_duplicate_tickers() {
        let err = AnalysisConfig::from_toml(
            r#"
[analysis]
tickers = ["^GSPC", "AMZN", "AMZN"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn rejects_inverted_dates_and_tiny_window() {
        let mut config = AnalysisConfig::default();
        config.analysis.start_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.analysis.rolling_window = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = AnalysisConfig::from_toml("[analysis\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AnalysisConfig::from_file(Path::new("/nonexistent/sharpelab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
