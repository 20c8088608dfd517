//! End-to-end analysis run.
//!
//! Stages, in order: fetch, persist raw table, filter-read the cleaned table,
//! CSV snapshot, returns, metrics, plots. Each stage consumes the previous
//! stage's output and the first failure aborts the run.

use crate::config::{AnalysisConfig, ConfigError};
use crate::metrics::{MetricsError, RiskMetrics};
use crate::plots::{cumulative_returns_chart, rolling_correlations_chart, RenderError};
use chrono::Datelike;
use sharpelab_core::data::{fetch_prices, DataError, DataProvider, FetchProgress};
use sharpelab_core::{
    write_price_csv, PriceStore, PriceTable, ReturnTable, SnapshotError, StoreError,
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data fetch failed: {0}")]
    Data(#[from] DataError),

    #[error("storage failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("metrics failed: {0}")]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Rows written to the raw table, nulls included.
    pub raw_rows: usize,
    pub cleaned: PriceTable,
    pub returns: ReturnTable,
    pub metrics: RiskMetrics,
    pub database: PathBuf,
    pub cleaned_csv: PathBuf,
    pub cumulative_returns_plot: PathBuf,
    pub rolling_correlations_plot: PathBuf,
}

/// Run the whole analysis with `provider` as the price source.
///
/// Output parent directories must exist.
pub fn run_analysis(
    config: &AnalysisConfig,
    provider: &dyn DataProvider,
    progress: &dyn FetchProgress,
) -> Result<AnalysisOutcome, AnalysisError> {
    config.validate()?;
    let a = &config.analysis;
    let out = &config.output;

    tracing::info!(
        provider = provider.name(),
        tickers = ?a.tickers,
        start = %a.start_date,
        end = %a.end_date,
        "fetching prices"
    );
    let raw = fetch_prices(provider, &a.tickers, a.start_date, a.end_date, progress)?;

    let (raw_rows, cleaned) = persist_and_clean(config, &raw)?;
    tracing::info!(
        raw_rows,
        cleaned_rows = cleaned.len(),
        dropped = raw_rows - cleaned.len().min(raw_rows),
        "cleaned price table"
    );

    write_price_csv(&cleaned, &out.cleaned_csv)?;
    tracing::info!(path = %out.cleaned_csv.display(), "wrote cleaned snapshot");

    let returns = cleaned.returns();
    let metrics = RiskMetrics::compute(
        &returns,
        &a.benchmark,
        a.annual_risk_free_rate,
        a.trading_days_per_year,
        a.rolling_window,
    )?;
    for entry in &metrics.sharpe {
        if entry.sharpe.is_nan() {
            tracing::warn!(ticker = %entry.ticker, "Sharpe ratio undefined (zero volatility or too few returns)");
        }
    }
    tracing::info!(
        returns = returns.len(),
        daily_rf = metrics.daily_risk_free_rate,
        "computed metrics"
    );
    for ticker in config.non_benchmark_tickers() {
        tracing::debug!(
            ticker,
            sharpe = metrics.sharpe_for(ticker).unwrap_or(f64::NAN),
            correlation = metrics
                .correlation
                .get(ticker, &a.benchmark)
                .unwrap_or(f64::NAN),
            "benchmark comparison"
        );
    }

    cumulative_returns_chart(&returns, cumulative_title(&returns))
        .write_svg(&out.cumulative_returns_plot)?;
    rolling_correlations_chart(
        returns.dates(),
        &metrics.rolling,
        a.rolling_window,
        &a.benchmark_label,
    )
    .write_svg(&out.rolling_correlations_plot)?;
    tracing::info!(
        cumulative = %out.cumulative_returns_plot.display(),
        rolling = %out.rolling_correlations_plot.display(),
        "rendered plots"
    );

    Ok(AnalysisOutcome {
        raw_rows,
        cleaned,
        returns,
        metrics,
        database: out.database.clone(),
        cleaned_csv: out.cleaned_csv.clone(),
        cumulative_returns_plot: out.cumulative_returns_plot.clone(),
        rolling_correlations_plot: out.rolling_correlations_plot.clone(),
    })
}

/// Replace the raw table and read back the complete rows. The connection is
/// released before returning, on success or failure.
fn persist_and_clean(
    config: &AnalysisConfig,
    raw: &PriceTable,
) -> Result<(usize, PriceTable), StoreError> {
    let a = &config.analysis;
    let out = &config.output;

    let mut store = PriceStore::open(&out.database)?;
    let raw_rows = store.replace_table(&out.table, raw)?;
    tracing::info!(
        path = %out.database.display(),
        table = %out.table,
        rows = raw_rows,
        "stored raw prices"
    );
    let cleaned = store.read_clean(&out.table, &a.tickers, a.start_date, a.end_date)?;
    store.close()?;
    Ok((raw_rows, cleaned))
}

/// `Cumulative Returns (YYYY-YYYY)` from the first and last return dates.
fn cumulative_title(returns: &ReturnTable) -> String {
    match (returns.dates().first(), returns.dates().last()) {
        (Some(first), Some(last)) => {
            format!("Cumulative Returns ({}-{})", first.year(), last.year())
        }
        _ => "Cumulative Returns".to_string(),
    }
}
