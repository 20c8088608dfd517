//! Flat-file snapshot of a price table.
//!
//! Layout: header `Date,<ticker>,...` then one row per trading date, ISO
//! dates, prices at full precision, missing cells empty.

use crate::prices::PriceTable;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Write `prices` as CSV to `path`, overwriting any existing file.
pub fn write_price_csv(prices: &PriceTable, path: &Path) -> Result<(), SnapshotError> {
    let wrap = |source: csv::Error| SnapshotError::Write {
        path: path.display().to_string(),
        source,
    };

    let mut wtr = csv::Writer::from_path(path).map_err(wrap)?;
    write_records(prices, &mut wtr).map_err(wrap)?;
    wtr.flush().map_err(|e| wrap(e.into()))?;

    tracing::debug!(path = %path.display(), rows = prices.len(), "wrote price snapshot");
    Ok(())
}

/// Render `prices` as an in-memory CSV string.
pub fn price_csv_string(prices: &PriceTable) -> Result<String, csv::Error> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    write_records(prices, &mut wtr)?;
    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn write_records<W: std::io::Write>(
    prices: &PriceTable,
    wtr: &mut csv::Writer<W>,
) -> Result<(), csv::Error> {
    let mut header = Vec::with_capacity(prices.tickers().len() + 1);
    header.push("Date");
    header.extend(prices.tickers().iter().map(String::as_str));
    wtr.write_record(&header)?;

    for (i, date) in prices.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(date.format("%Y-%m-%d").to_string());
        for cell in prices.row(i).unwrap_or_default() {
            record.push(cell.map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    Ok(())
}
