//! Yahoo Finance data provider.
//!
//! Fetches daily adjusted closes from Yahoo's v8 chart API. One request per
//! symbol, no retry: any failure is returned to the caller, which aborts the
//! run.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::provider::{DailyPrice, DataError, DataProvider, DataSource, FetchResult};
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at a different chart endpoint (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the chart API URL for a symbol and inclusive date range.
    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // Last second of `end`, so the range is inclusive.
        let end_ts = (end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp()
            - 1;
        format!(
            "{base}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true",
            base = self.base_url.trim_end_matches('/'),
            symbol = encode_symbol(symbol),
        )
    }

    /// Parse the chart API response into daily prices.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<DailyPrice>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // No timestamps means no trading days in range.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);
        let closes = data.indicators.quote.into_iter().next().map(|q| q.close);

        // Prefer the adjusted series; fall back to raw closes when Yahoo omits it.
        let series = match (adj_closes, closes) {
            (Some(adj), _) => adj,
            (None, Some(close)) => {
                tracing::warn!(symbol, "no adjusted closes in response, using raw closes");
                close
            }
            (None, None) => {
                return Err(DataError::ResponseFormatChanged(
                    "no adjclose or quote data".into(),
                ))
            }
        };

        let mut prices = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            prices.push(DailyPrice {
                date,
                adj_close: series.get(i).copied().flatten(),
            });
        }

        // Yahoo occasionally repeats the final (intraday) bar's date.
        prices.dedup_by(|next, prev| {
            if next.date == prev.date {
                if next.adj_close.is_some() {
                    prev.adj_close = next.adj_close;
                }
                true
            } else {
                false
            }
        });

        Ok(prices)
    }

    fn fetch_once(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>, DataError> {
        let url = self.chart_url(symbol, start, end);
        tracing::debug!(%url, "requesting chart");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();

        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(DataError::Forbidden {
                status: status.as_u16(),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        Self::parse_response(symbol, chart)
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let prices = self
            .fetch_once(symbol, start, end)?
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect();
        Ok(FetchResult {
            symbol: symbol.to_string(),
            prices,
            source: DataSource::YahooFinance,
        })
    }
}

/// Percent-encode the characters index symbols use (`^GSPC`, `BRK.B` is fine).
fn encode_symbol(symbol: &str) -> String {
    let mut out = String::with_capacity(symbol.len());
    for c in symbol.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '-' | '_' | '=' => out.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{b:02X}"));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(symbol: &str, json: &str) -> Result<Vec<DailyPrice>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response(symbol, resp)
    }

    #[test]
    fn encodes_index_caret() {
        assert_eq!(encode_symbol("^GSPC"), "%5EGSPC");
        assert_eq!(encode_symbol("AMZN"), "AMZN");
        assert_eq!(encode_symbol("BRK-B"), "BRK-B");
    }

    #[test]
    fn chart_url_covers_whole_end_day() {
        let provider = YahooProvider::new()
            .unwrap()
            .with_base_url("http://localhost:9/chart/");
        let url = provider.chart_url(
            "^GSPC",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert_eq!(
            url,
            "http://localhost:9/chart/%5EGSPC?period1=1704067200&period2=1704153599\
             &interval=1d&includeAdjustedClose=true"
        );
    }

    #[test]
    fn parses_adjusted_closes_and_keeps_nulls() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{
                "quote":[{"close":[150.0,151.0,152.0]}],
                "adjclose":[{"adjclose":[149.5,null,151.5]}]
            }}],"error":null}}"#;

        let prices = parse("AMZN", json).unwrap();
        assert_eq!(prices.len(), 3);
        assert_eq!(prices[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(prices[0].adj_close, Some(149.5));
        assert_eq!(prices[1].adj_close, None);
        assert_eq!(prices[2].adj_close, Some(151.5));
    }

    #[test]
    fn falls_back_to_raw_close() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800],
            "indicators":{"quote":[{"close":[150.0]}]}}],"error":null}}"#;

        let prices = parse("AMZN", json).unwrap();
        assert_eq!(prices[0].adj_close, Some(150.0));
    }

    #[test]
    fn missing_timestamps_mean_no_rows() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse("AMZN", json).unwrap().is_empty());
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse("NOPE", json).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { symbol } if symbol == "NOPE"));
    }

    #[test]
    fn duplicate_trailing_date_is_collapsed() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200,1704299400],
            "indicators":{
                "quote":[{"close":[1.0,2.0,2.5]}],
                "adjclose":[{"adjclose":[1.0,2.0,2.5]}]
            }}],"error":null}}"#;

        let prices = parse("AMZN", json).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[1].adj_close, Some(2.5));
    }
}
