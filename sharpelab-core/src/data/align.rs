//! Multi-ticker time alignment.
//!
//! Per-ticker price histories are outer-joined on the union of their dates.
//! A ticker with no price on a date gets a missing cell; nothing is filled.

use super::provider::DailyPrice;
use crate::prices::{PriceTable, TableError};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Align per-ticker histories into a single table, columns in `tickers` order.
///
/// Tickers absent from `series` become all-missing columns.
pub fn align_prices(
    tickers: &[String],
    series: &HashMap<String, Vec<DailyPrice>>,
) -> Result<PriceTable, TableError> {
    let dates: Vec<NaiveDate> = series
        .values()
        .flatten()
        .map(|p| p.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let columns = tickers
        .iter()
        .map(|ticker| {
            let by_date: HashMap<NaiveDate, Option<f64>> = series
                .get(ticker)
                .map(|prices| prices.iter().map(|p| (p.date, p.adj_close)).collect())
                .unwrap_or_default();
            dates
                .iter()
                .map(|date| by_date.get(date).copied().flatten())
                .collect()
        })
        .collect();

    PriceTable::new(dates, tickers.to_vec(), columns)
}
