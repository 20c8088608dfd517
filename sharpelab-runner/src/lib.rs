//! SharpeLab Runner — configuration, metrics, plots, and the analysis pipeline.
//!
//! This crate builds on `sharpelab-core` to provide:
//! - TOML-backed analysis configuration
//! - Sharpe ratios, correlation matrix and rolling correlations
//! - SVG line charts of cumulative returns and rolling correlations
//! - The end-to-end run and its console report

pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod plots;
pub mod report;

pub use config::{AnalysisConfig, AnalysisSection, ConfigError, OutputSection};
pub use metrics::{
    cumulative_returns, daily_risk_free_rate, pearson, rolling_correlation, sharpe_ratio,
    CorrelationMatrix, MetricsError, RiskMetrics, RollingCorrelation, SharpeEntry,
};
pub use pipeline::{run_analysis, AnalysisError, AnalysisOutcome};
pub use plots::{
    cumulative_returns_chart, rolling_correlations_chart, LineChart, LineSeries, RenderError,
};
pub use report::{format_report, print_report};
