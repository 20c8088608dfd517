//! Price data providers and the fetch stage

pub mod align;
pub mod fetch;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use align::align_prices;
pub use fetch::fetch_prices;
pub use provider::{
    DailyPrice, DataError, DataProvider, DataSource, FetchProgress, FetchResult, LogProgress,
    NoProgress,
};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
