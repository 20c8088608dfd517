//! Fetch stage: download every ticker and align into one price table.

use super::align::align_prices;
use super::provider::{DataError, DataProvider, FetchProgress};
use crate::prices::PriceTable;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Fetch adjusted closes for all `tickers` over `[start, end]`.
///
/// The first provider error aborts the whole fetch. An aligned table with
/// no rows is [`DataError::NoData`].
pub fn fetch_prices(
    provider: &dyn DataProvider,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn FetchProgress,
) -> Result<PriceTable, DataError> {
    let total = tickers.len();
    let mut series = HashMap::with_capacity(total);

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(ticker, i, total);
        let result = provider.fetch(ticker, start, end)?;
        progress.on_complete(ticker, result.prices.len());
        series.insert(result.symbol, result.prices);
    }

    let table = align_prices(tickers, &series)
        .map_err(|e| DataError::Other(format!("failed to align fetched prices: {e}")))?;

    if table.is_empty() {
        return Err(DataError::NoData {
            symbols: tickers.to_vec(),
            start,
            end,
        });
    }

    tracing::info!(
        provider = provider.name(),
        rows = table.len(),
        missing = table.missing_cells(),
        "fetched price table"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DailyPrice, DataSource, FetchResult, NoProgress};
    use crate::data::synthetic::SyntheticProvider;
    use std::cell::RefCell;

    struct EmptyProvider {
        calls: RefCell<Vec<String>>,
    }

    impl DataProvider for EmptyProvider {
        fn name(&self) -> &str {
            "empty"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.calls.borrow_mut().push(symbol.to_string());
            Ok(FetchResult {
                symbol: symbol.to_string(),
                prices: Vec::<DailyPrice>::new(),
                source: DataSource::Synthetic,
            })
        }
    }

    struct FailingProvider;

    impl DataProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
    }

    fn tickers() -> Vec<String> {
        vec!["AMZN".into(), "META".into(), "^GSPC".into()]
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
    }

    #[test]
    fn fetches_every_ticker_into_one_table() {
        let (start, end) = range();
        let table = fetch_prices(
            &SyntheticProvider::new("fetch"),
            &tickers(),
            start,
            end,
            &NoProgress,
        )
        .unwrap();

        assert_eq!(table.tickers(), tickers().as_slice());
        assert!(table.len() > 100);
        assert!(table.is_complete());
    }

    #[test]
    fn empty_fetch_is_no_data() {
        let (start, end) = range();
        let provider = EmptyProvider {
            calls: RefCell::new(Vec::new()),
        };
        let err = fetch_prices(&provider, &tickers(), start, end, &NoProgress).unwrap_err();

        assert!(matches!(err, DataError::NoData { .. }));
        assert_eq!(provider.calls.borrow().len(), 3);
    }

    #[test]
    fn provider_error_aborts() {
        let (start, end) = range();
        let err = fetch_prices(&FailingProvider, &tickers(), start, end, &NoProgress).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { symbol } if symbol == "AMZN"));
    }
}
