//! SharpeLab CLI — fetch prices, persist and clean them, report risk metrics.
//!
//! With no arguments this runs the standard analysis (AMZN and META against
//! the S&P 500, 2020-01-01 to 2025-06-24) against Yahoo Finance, writing
//! `data/` and `plots/` under the current directory.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use sharpelab_core::data::{DataProvider, LogProgress, SyntheticProvider, YahooProvider};
use sharpelab_runner::{print_report, run_analysis, AnalysisConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sharpelab",
    about = "SharpeLab — Sharpe ratios and benchmark correlations for a basket of stocks"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to the standard analysis.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start date (YYYY-MM-DD), overriding the config.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD), overriding the config.
    #[arg(long)]
    end: Option<String>,

    /// Use deterministic synthetic prices instead of Yahoo Finance.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(start) = cli.start.as_deref() {
        config.analysis.start_date = parse_date(start)?;
    }
    if let Some(end) = cli.end.as_deref() {
        config.analysis.end_date = parse_date(end)?;
    }
    config.validate()?;

    create_output_dirs(&config)?;

    let provider: Box<dyn DataProvider> = if cli.synthetic {
        Box::new(SyntheticProvider::new("sharpelab"))
    } else {
        Box::new(YahooProvider::new()?)
    };

    println!("Fetching data...");
    let outcome = run_analysis(&config, provider.as_ref(), &LogProgress)
        .context("analysis failed")?;
    print_report(&outcome);
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) => Ok(d),
        Err(_) => bail!("invalid date '{s}', expected YYYY-MM-DD"),
    }
}

fn create_output_dirs(config: &AnalysisConfig) -> Result<()> {
    for path in config.output_paths() {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir(dir)?;
        }
    }
    Ok(())
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}
