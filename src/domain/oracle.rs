//! Cached daily closing prices backed by a rate-limited quote feed.
//!
//! The first lookup of a symbol pulls its whole daily series and caches
//! every session, so later lookups for any covered date never touch the
//! feed again. API keys are used round-robin. A throttled key costs one
//! cooldown sleep and a retry with the next key, up to one retry per key.

use std::collections::{BTreeMap, HashMap};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::calendar::TradeDate;
use super::error::TraderError;
use super::money::Money;
use crate::ports::price_port::PricePort;
use crate::ports::quote_port::{DailyClose, QuoteFeed, QuotePort};

/// Default wait after a throttled request.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSettings {
    pub api_keys: Vec<String>,
    pub cooldown: Duration,
}

impl OracleSettings {
    pub fn new(api_keys: Vec<String>) -> Self {
        OracleSettings {
            api_keys,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

pub struct PriceOracle<Q: QuotePort> {
    feed: Q,
    api_keys: Vec<String>,
    cooldown: Duration,
    next_key: usize,
    consecutive_rate_limits: usize,
    cache: HashMap<String, BTreeMap<TradeDate, Money>>,
}

impl<Q: QuotePort> PriceOracle<Q> {
    pub fn new(feed: Q, settings: OracleSettings) -> Result<Self, TraderError> {
        let api_keys: Vec<String> = settings
            .api_keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if api_keys.is_empty() {
            return Err(TraderError::ConfigMissing {
                section: "oracle".into(),
                key: "api_keys".into(),
            });
        }
        Ok(PriceOracle {
            feed,
            api_keys,
            cooldown: settings.cooldown,
            next_key: 0,
            consecutive_rate_limits: 0,
            cache: HashMap::new(),
        })
    }

    pub fn feed(&self) -> &Q {
        &self.feed
    }

    pub fn is_cached(&self, symbol: &str) -> bool {
        self.cache.contains_key(symbol)
    }

    /// Number of cached sessions for `symbol`.
    pub fn cached_sessions(&self, symbol: &str) -> usize {
        self.cache.get(symbol).map_or(0, BTreeMap::len)
    }

    fn take_key(&mut self) -> usize {
        let index = self.next_key;
        self.next_key = (self.next_key + 1) % self.api_keys.len();
        index
    }

    /// Fetch the full series, cooling down and rotating keys while throttled.
    fn fetch_series(&mut self, symbol: &str) -> Result<Vec<DailyClose>, TraderError> {
        loop {
            let key = self.take_key();
            match self.feed.fetch_daily_series(symbol, &self.api_keys[key]) {
                Ok(QuoteFeed::Series(rows)) => {
                    self.consecutive_rate_limits = 0;
                    debug!("{}: fetched {} sessions with key #{}", symbol, rows.len(), key);
                    return Ok(rows);
                }
                Ok(QuoteFeed::RateLimited) => {
                    self.consecutive_rate_limits += 1;
                    if self.consecutive_rate_limits > self.api_keys.len() {
                        let attempts = self.consecutive_rate_limits;
                        self.consecutive_rate_limits = 0;
                        return Err(TraderError::SourceExhausted {
                            symbol: symbol.to_string(),
                            attempts,
                        });
                    }
                    warn!(
                        "{}: key #{} rate limited, cooling down {:?} before rotating",
                        symbol, key, self.cooldown
                    );
                    if !self.cooldown.is_zero() {
                        thread::sleep(self.cooldown);
                    }
                }
                Err(e) => {
                    self.consecutive_rate_limits = 0;
                    return Err(e);
                }
            }
        }
    }
}

/// Scan a newest-first series for `date`.
///
/// Stops at the first session older than `date` once no match has been
/// seen, since the series cannot contain it further down.
fn find_close(rows: &[DailyClose], date: TradeDate) -> Option<Money> {
    for row in rows {
        if row.date == date {
            return Some(row.close);
        }
        if row.date < date {
            return None;
        }
    }
    None
}

impl<Q: QuotePort> PricePort for PriceOracle<Q> {
    fn price_on(&mut self, symbol: &str, date: TradeDate) -> Result<Money, TraderError> {
        let no_data = || TraderError::NoTradingData {
            symbol: symbol.to_string(),
            date,
        };

        if let Some(series) = self.cache.get(symbol) {
            debug!("{}: cache hit for {}", symbol, date);
            return series.get(&date).copied().ok_or_else(no_data);
        }

        debug!("{}: cache miss, fetching full series", symbol);
        let rows = self.fetch_series(symbol)?;
        let found = find_close(&rows, date);
        self.cache.insert(
            symbol.to_string(),
            rows.into_iter().map(|row| (row.date, row.close)).collect(),
        );
        found.ok_or_else(no_data)
    }
}
