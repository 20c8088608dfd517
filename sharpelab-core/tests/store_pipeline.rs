//! Integration tests for fetch, persistence, and snapshot.
//!
//! Uses proptest to verify that the SQL filter query and the in-memory
//! `complete_rows` agree on arbitrary tables with missing cells.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use sharpelab_core::data::{fetch_prices, NoProgress, SyntheticProvider};
use sharpelab_core::snapshot::price_csv_string;
use sharpelab_core::{write_price_csv, PriceStore, PriceTable};

fn tickers() -> Vec<String> {
    vec!["AMZN".into(), "META".into(), "^GSPC".into()]
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn synthetic_fetch_survives_store_and_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stock_data.db");
    let csv_path = dir.path().join("cleaned_stock_prices.csv");
    let (start, end) = (ymd(2024, 1, 1), ymd(2024, 3, 31));

    let raw = fetch_prices(
        &SyntheticProvider::new("store"),
        &tickers(),
        start,
        end,
        &NoProgress,
    )
    .unwrap();
    assert!(raw.is_complete());

    let mut store = PriceStore::open(&db).unwrap();
    let written = store.replace_table("raw_stock_prices", &raw).unwrap();
    assert_eq!(written, raw.len());
    store.close().unwrap();

    let store = PriceStore::open(&db).unwrap();
    let cleaned = store
        .read_clean("raw_stock_prices", &tickers(), start, end)
        .unwrap();
    assert_eq!(cleaned, raw);

    write_price_csv(&cleaned, &csv_path).unwrap();
    let on_disk = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(on_disk, price_csv_string(&cleaned).unwrap());
}

#[test]
fn clean_read_narrows_to_requested_range() {
    let raw = fetch_prices(
        &SyntheticProvider::new("range"),
        &tickers(),
        ymd(2024, 1, 1),
        ymd(2024, 2, 29),
        &NoProgress,
    )
    .unwrap();

    let mut store = PriceStore::open_in_memory().unwrap();
    store.replace_table("raw_stock_prices", &raw).unwrap();
    let feb = store
        .read_clean("raw_stock_prices", &tickers(), ymd(2024, 2, 1), ymd(2024, 2, 29))
        .unwrap();

    assert!(!feb.is_empty());
    assert_eq!(feb.dates().first(), Some(&ymd(2024, 2, 1)));
    assert_eq!(feb.dates().last(), Some(&ymd(2024, 2, 29)));
    assert!(feb.dates().windows(2).all(|w| w[0] < w[1]));
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_cell() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        4 => (1.0..1000.0_f64).prop_map(Some),
    ]
}

fn arb_table() -> impl Strategy<Value = PriceTable> {
    prop::collection::vec(prop::collection::vec(arb_cell(), 3), 1..40).prop_map(|rows| {
        let start = ymd(2024, 1, 1);
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| (start + Duration::days(i as i64), cells))
            .collect();
        PriceTable::from_rows(tickers(), rows).unwrap()
    })
}

proptest! {
    /// The SQL filter and the in-memory filter select the same rows.
    #[test]
    fn sql_filter_matches_complete_rows(
        table in arb_table(),
        from in 0i64..20,
        span in 0i64..40,
    ) {
        let start = ymd(2024, 1, 1) + Duration::days(from);
        let end = start + Duration::days(span);
        let expected = table.complete_rows(start, end);

        let mut store = PriceStore::open_in_memory().unwrap();
        store.replace_table("raw_stock_prices", &table).unwrap();
        match store.read_clean("raw_stock_prices", &tickers(), start, end) {
            Ok(cleaned) => prop_assert_eq!(cleaned, expected),
            Err(_) => prop_assert!(expected.is_empty()),
        }
    }
}
