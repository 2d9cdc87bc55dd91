//! Alpha Vantage daily-series adapter.
//!
//! One `TIME_SERIES_DAILY` request per symbol with `outputsize=full` and
//! `datatype=csv`. The provider answers `timestamp,open,high,low,close,volume`
//! rows newest first; throttling and bad tickers come back as a JSON notice
//! in the body rather than as an HTTP status.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::blocking::Client;
use rust_decimal::Decimal;

use crate::domain::error::TraderError;
use crate::domain::money::Money;
use crate::ports::quote_port::{DailyClose, QuoteFeed, QuotePort};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CLOSE_COLUMN: usize = 4;
const RATE_LIMIT_MARKERS: [&str; 2] = ["Thank you for using Alpha Vantage", "API call frequency"];
const ERROR_MARKER: &str = "Error";

pub struct AlphaVantageAdapter {
    client: Client,
    base_url: String,
}

impl AlphaVantageAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TraderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TraderError::ConfigInvalid {
                section: "oracle".into(),
                key: "timeout_secs".into(),
                reason: format!("cannot build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    fn unavailable(symbol: &str, reason: impl std::fmt::Display) -> TraderError {
        TraderError::SourceUnavailable {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl QuotePort for AlphaVantageAdapter {
    fn fetch_daily_series(&self, symbol: &str, api_key: &str) -> Result<QuoteFeed, TraderError> {
        let params = [
            ("function", "TIME_SERIES_DAILY"),
            ("outputsize", "full"),
            ("symbol", symbol),
            ("apikey", api_key),
            ("datatype", "csv"),
        ];
        let url = reqwest::Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| Self::unavailable(symbol, format!("bad URL: {}", e)))?;
        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(api_key, "***")
        );

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Self::unavailable(symbol, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(QuoteFeed::RateLimited);
        }
        if !status.is_success() {
            return Err(Self::unavailable(symbol, format!("HTTP {}", status)));
        }

        let body = response.text().map_err(|e| Self::unavailable(symbol, e))?;
        parse_daily_csv(symbol, &body)
    }
}

/// Interpret one response body.
///
/// A throttling notice wins over everything else, then an error notice
/// (the provider's answer for an unknown ticker). Anything else is read as
/// CSV; rows whose first column is not a date (the header) are skipped.
pub fn parse_daily_csv(symbol: &str, body: &str) -> Result<QuoteFeed, TraderError> {
    if RATE_LIMIT_MARKERS.iter().any(|m| body.contains(m)) {
        warn!("Alpha Vantage throttled request for {}", symbol);
        return Ok(QuoteFeed::RateLimited);
    }
    if body.contains(ERROR_MARKER) {
        return Err(TraderError::UnknownSymbol {
            symbol: symbol.to_string(),
        });
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            AlphaVantageAdapter::unavailable(symbol, format!("CSV parse error: {}", e))
        })?;
        let Some(date) = record
            .get(0)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        else {
            continue;
        };
        let raw = record.get(CLOSE_COLUMN).ok_or_else(|| {
            AlphaVantageAdapter::unavailable(symbol, format!("missing close column on {}", date))
        })?;
        let close = Decimal::from_str(raw)
            .ok()
            .and_then(|d| Money::new(d).ok())
            .ok_or_else(|| {
                AlphaVantageAdapter::unavailable(
                    symbol,
                    format!("invalid close value '{}' on {}", raw, date),
                )
            })?;
        rows.push(DailyClose { date, close });
    }
    Ok(QuoteFeed::Series(rows))
}
