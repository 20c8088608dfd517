//! Deterministic synthetic price provider.
//!
//! Every symbol shares one market factor path, so the generated series are
//! correlated with each other the way equities are with an index. Each
//! symbol then adds its own idiosyncratic noise. Paths are seeded from
//! BLAKE3 hashes of the seed label and symbol, so a given provider always
//! produces the same prices for the same request.

use super::provider::{DailyPrice, DataError, DataProvider, DataSource, FetchResult};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthetic random-walk provider for offline runs and tests.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: String,
    start_price: f64,
    market_vol: f64,
    idio_vol: f64,
}

impl SyntheticProvider {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            start_price: 100.0,
            market_vol: 0.012,
            idio_vol: 0.008,
        }
    }

    fn rng_for(&self, stream: &str) -> StdRng {
        let hash = blake3::hash(format!("{}/{stream}", self.seed).as_bytes());
        StdRng::from_seed(*hash.as_bytes())
    }

    /// Sensitivity of a symbol to the market factor, in [0.6, 1.4).
    fn beta_for(&self, symbol: &str) -> f64 {
        self.rng_for(&format!("beta/{symbol}")).gen_range(0.6..1.4)
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        if end < start {
            return Err(DataError::Other(format!(
                "end date {end} is before start date {start}"
            )));
        }

        let mut market = self.rng_for("market");
        let mut noise = self.rng_for(&format!("symbol/{symbol}"));
        let beta = self.beta_for(symbol);

        let mut prices = Vec::new();
        let mut price = self.start_price;
        let mut current = start;

        while current <= end {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                // Draw from both streams every trading day so paths stay aligned
                // across symbols regardless of request order.
                let m: f64 = market.gen_range(-1.0..1.0) * self.market_vol * 3f64.sqrt();
                let e: f64 = noise.gen_range(-1.0..1.0) * self.idio_vol * 3f64.sqrt();
                if !prices.is_empty() {
                    price *= 1.0 + 0.0003 + beta * m + e;
                }
                prices.push(DailyPrice {
                    date: current,
                    adj_close: Some(price),
                });
            }
            current += Duration::days(1);
        }

        Ok(FetchResult {
            symbol: symbol.to_string(),
            prices,
            source: DataSource::Synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    #[test]
    fn same_seed_same_prices() {
        let (start, end) = range();
        let a = SyntheticProvider::new("seed").fetch("AMZN", start, end).unwrap();
        let b = SyntheticProvider::new("seed").fetch("AMZN", start, end).unwrap();
        assert_eq!(a.prices, b.prices);
        assert_eq!(a.source, DataSource::Synthetic);
    }

    #[test]
    fn symbols_differ() {
        let (start, end) = range();
        let provider = SyntheticProvider::new("seed");
        let a = provider.fetch("AMZN", start, end).unwrap();
        let b = provider.fetch("META", start, end).unwrap();
        assert_ne!(a.prices, b.prices);
    }

    #[test]
    fn weekdays_only_and_positive() {
        let (start, end) = range();
        let result = SyntheticProvider::new("seed").fetch("^GSPC", start, end).unwrap();
        assert!(!result.prices.is_empty());
        for p in &result.prices {
            assert!(!matches!(p.date.weekday(), Weekday::Sat | Weekday::Sun));
            assert!(p.adj_close.unwrap() > 0.0);
        }
        assert_eq!(result.prices[0].adj_close, Some(100.0));
    }

    #[test]
    fn inverted_range_is_an_error() {
        let (start, end) = range();
        assert!(SyntheticProvider::new("seed").fetch("SPY", end, start).is_err());
    }
}
