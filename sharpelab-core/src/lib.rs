//! SharpeLab Core — price tables, data providers, persistence.
//!
//! This crate contains the data side of the analysis pipeline:
//! - Date-indexed price and return tables
//! - Data providers (Yahoo Finance, deterministic synthetic) and the fetch stage
//! - SQLite persistence with the filter-query cleaning step
//! - CSV snapshot of the cleaned table

pub mod data;
pub mod prices;
pub mod snapshot;
pub mod store;

pub use prices::{PriceTable, ReturnTable, TableError};
pub use snapshot::{write_price_csv, SnapshotError};
pub use store::{PriceStore, StoreError};
