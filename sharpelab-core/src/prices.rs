//! Date-indexed price and return tables.
//!
//! A [`PriceTable`] holds one adjusted-close column per ticker on a shared,
//! strictly increasing date axis. Cells are `Option<f64>` because raw
//! downloads are outer-joined across tickers and may have gaps; a cleaned
//! table has no missing cells.
//!
//! A [`ReturnTable`] is derived from a price table by period-over-period
//! fractional change and is one row shorter than its source.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Shape and ordering violations when building a table.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column count {columns} does not match ticker count {tickers}")]
    ColumnCount { tickers: usize, columns: usize },

    #[error("column '{ticker}' has {len} rows, expected {expected}")]
    ColumnLength {
        ticker: String,
        len: usize,
        expected: usize,
    },

    #[error("dates must be strictly increasing: {prev} is followed by {next}")]
    UnorderedDates { prev: NaiveDate, next: NaiveDate },

    #[error("duplicate ticker column '{0}'")]
    DuplicateTicker(String),
}

/// Adjusted close prices, one column per ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table from column-major data.
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, TableError> {
        validate_shape(&dates, &tickers, columns.iter().map(Vec::len))?;
        Ok(Self {
            dates,
            tickers,
            columns,
        })
    }

    /// Build a table from row-major data, as read back from the store.
    pub fn from_rows(
        tickers: Vec<String>,
        rows: Vec<(NaiveDate, Vec<Option<f64>>)>,
    ) -> Result<Self, TableError> {
        let mut dates = Vec::with_capacity(rows.len());
        let mut columns: Vec<Vec<Option<f64>>> =
            vec![Vec::with_capacity(rows.len()); tickers.len()];

        for (date, values) in rows {
            if values.len() != tickers.len() {
                return Err(TableError::ColumnCount {
                    tickers: tickers.len(),
                    columns: values.len(),
                });
            }
            dates.push(date);
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }

        Self::new(dates, tickers, columns)
    }

    /// An empty table with the given ticker columns.
    pub fn empty(tickers: Vec<String>) -> Self {
        let columns = vec![Vec::new(); tickers.len()];
        Self {
            dates: Vec::new(),
            tickers,
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Number of rows (trading dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Column for a ticker, if present.
    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    /// Cells of a single row in ticker order.
    pub fn row(&self, index: usize) -> Option<Vec<Option<f64>>> {
        if index >= self.len() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[index]).collect())
    }

    /// Number of cells that are missing or non-finite.
    pub fn missing_cells(&self) -> usize {
        self.columns
            .iter()
            .flatten()
            .filter(|v| !v.is_some_and(f64::is_finite))
            .count()
    }

    /// True when every cell holds a finite price.
    pub fn is_complete(&self) -> bool {
        self.missing_cells() == 0
    }

    /// Rows where every ticker has a price and the date lies in `[start, end]`.
    ///
    /// This is the in-memory form of the store's filter query.
    pub fn complete_rows(&self, start: NaiveDate, end: NaiveDate) -> PriceTable {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| {
                let date = self.dates[i];
                date >= start
                    && date <= end
                    && self.columns.iter().all(|c| c[i].is_some_and(f64::is_finite))
            })
            .collect();

        PriceTable {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            tickers: self.tickers.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| keep.iter().map(|&i| c[i]).collect())
                .collect(),
        }
    }

    /// Period-over-period fractional change, dropping the first row.
    ///
    /// A missing price on either side of a step yields NaN for that step.
    pub fn returns(&self) -> ReturnTable {
        let dates = self.dates.iter().skip(1).copied().collect();
        let columns = self
            .columns
            .iter()
            .map(|column| {
                column
                    .windows(2)
                    .map(|w| match (w[0], w[1]) {
                        (Some(prev), Some(cur)) => (cur - prev) / prev,
                        _ => f64::NAN,
                    })
                    .collect()
            })
            .collect();

        ReturnTable {
            dates,
            tickers: self.tickers.clone(),
            columns,
        }
    }
}

/// Daily fractional returns, one column per ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl ReturnTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, TableError> {
        validate_shape(&dates, &tickers, columns.iter().map(Vec::len))?;
        Ok(Self {
            dates,
            tickers,
            columns,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    /// Columns paired with their ticker, in table order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.tickers
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }
}

fn validate_shape(
    dates: &[NaiveDate],
    tickers: &[String],
    column_lens: impl ExactSizeIterator<Item = usize>,
) -> Result<(), TableError> {
    if column_lens.len() != tickers.len() {
        return Err(TableError::ColumnCount {
            tickers: tickers.len(),
            columns: column_lens.len(),
        });
    }

    for (ticker, len) in tickers.iter().zip(column_lens) {
        if len != dates.len() {
            return Err(TableError::ColumnLength {
                ticker: ticker.clone(),
                len,
                expected: dates.len(),
            });
        }
    }

    let mut seen = HashSet::new();
    for ticker in tickers {
        if !seen.insert(ticker.as_str()) {
            return Err(TableError::DuplicateTicker(ticker.clone()));
        }
    }

    for w in dates.windows(2) {
        if w[0] >= w[1] {
            return Err(TableError::UnorderedDates {
                prev: w[0],
                next: w[1],
            });
        }
    }

    Ok(())
}
