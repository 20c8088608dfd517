//! SQLite persistence for raw price tables.
//!
//! The raw fetched table is written wholesale (drop, create, insert in one
//! transaction) and read back through a filter query that keeps only rows
//! where every tracked ticker has a price and the date lies in the bound.
//!
//! Layout of a stored table:
//! `"Date" TEXT PRIMARY KEY` (ISO `YYYY-MM-DD`) followed by one nullable
//! `REAL` column per ticker, named verbatim (`"^GSPC"`).

use crate::prices::{PriceTable, TableError};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use thiserror::Error;

const DATE_COLUMN: &str = "Date";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("no rows in '{table}' after cleaning; check the filter query or data source")]
    EmptyResult { table: String },

    #[error("invalid date '{value}' in '{table}'")]
    InvalidDate { table: String, value: String },

    #[error("stored rows do not form a valid table: {0}")]
    Table(#[from] TableError),
}

/// A connection to the local price database.
///
/// Dropping the store closes the connection; [`PriceStore::close`] does the
/// same but reports close failures.
pub struct PriceStore {
    conn: Connection,
}

impl PriceStore {
    /// Open (or create) a file-backed database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened price store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Replace `table` with the contents of `prices`. Returns rows written.
    pub fn replace_table(&mut self, table: &str, prices: &PriceTable) -> Result<usize, StoreError> {
        let table_ident = quote_ident(table);
        let column_defs: String = prices
            .tickers()
            .iter()
            .map(|t| format!(", {} REAL", quote_ident(t)))
            .collect();
        let column_names: String = prices
            .tickers()
            .iter()
            .map(|t| format!(", {}", quote_ident(t)))
            .collect();
        let placeholders: String = (2..=prices.tickers().len() + 1)
            .map(|i| format!(", ?{i}"))
            .collect();

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table_ident};
             CREATE TABLE {table_ident} ({date} TEXT NOT NULL PRIMARY KEY{column_defs});",
            date = quote_ident(DATE_COLUMN),
        ))?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table_ident} ({date}{column_names}) VALUES (?1{placeholders})",
                date = quote_ident(DATE_COLUMN),
            ))?;

            for (i, date) in prices.dates().iter().enumerate() {
                let mut values = Vec::with_capacity(prices.tickers().len() + 1);
                values.push(Value::Text(date.format(DATE_FORMAT).to_string()));
                for cell in prices.row(i).unwrap_or_default() {
                    values.push(match cell {
                        Some(v) if v.is_finite() => Value::Real(v),
                        _ => Value::Null,
                    });
                }
                stmt.execute(params_from_iter(values))?;
            }
        }

        tx.commit()?;
        tracing::debug!(table, rows = prices.len(), "replaced table");
        Ok(prices.len())
    }

    /// Number of rows currently in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Read the rows of `table` where every ticker is non-null and the date
    /// lies in `[start, end]`, ordered by date.
    ///
    /// Zero matching rows is [`StoreError::EmptyResult`].
    pub fn read_clean(
        &self,
        table: &str,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, StoreError> {
        let sql = clean_query(table, tickers);
        tracing::debug!(%sql, "running clean query");

        let mut stmt = self.conn.prepare(&sql)?;
        let raw_rows = stmt.query_map(
            params![
                start.format(DATE_FORMAT).to_string(),
                end.format(DATE_FORMAT).to_string()
            ],
            |row| {
                let date: String = row.get(0)?;
                let values = (1..=tickers.len())
                    .map(|i| row.get::<_, Option<f64>>(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((date, values))
            },
        )?;

        let mut rows = Vec::new();
        for raw in raw_rows {
            let (date, values) = raw?;
            let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|_| {
                StoreError::InvalidDate {
                    table: table.to_string(),
                    value: date.clone(),
                }
            })?;
            rows.push((date, values));
        }

        if rows.is_empty() {
            return Err(StoreError::EmptyResult {
                table: table.to_string(),
            });
        }

        Ok(PriceTable::from_rows(tickers.to_vec(), rows)?)
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

/// The filter query used by [`PriceStore::read_clean`]. Dates bind to `?1`/`?2`.
pub fn clean_query(table: &str, tickers: &[String]) -> String {
    let date = quote_ident(DATE_COLUMN);
    let columns: String = tickers
        .iter()
        .map(|t| format!(", {}", quote_ident(t)))
        .collect();
    let not_null: String = tickers
        .iter()
        .map(|t| format!("{} IS NOT NULL AND ", quote_ident(t)))
        .collect();
    format!(
        "SELECT {date}{columns} FROM {table} \
         WHERE {not_null}{date} >= ?1 AND {date} <= ?2 \
         ORDER BY {date}",
        table = quote_ident(table),
    )
}

/// Double-quote an SQL identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
