#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use tradeledger::domain::error::TraderError;
use tradeledger::domain::money::Money;
use tradeledger::ports::price_port::PricePort;
pub use tradeledger::ports::quote_port::{DailyClose, QuoteFeed, QuotePort};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn money(amount: Decimal) -> Money {
    Money::new(amount).unwrap()
}

/// A newest-first series with one session per weekday in `[from, to]`,
/// closing at `close` every day.
pub fn weekday_series(from: NaiveDate, to: NaiveDate, close: Decimal) -> Vec<DailyClose> {
    let mut rows = Vec::new();
    let mut day = to;
    while day >= from {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            rows.push(DailyClose {
                date: day,
                close: money(close),
            });
        }
        day = day.pred_opt().unwrap();
    }
    rows
}

/// Quote feed that replays scripted responses per symbol and records every
/// call as `(symbol, api_key)`.
pub struct ScriptedQuotePort {
    pub responses: RefCell<HashMap<String, VecDeque<Result<QuoteFeed, TraderError>>>>,
    pub calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedQuotePort {
    pub fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_response(self, symbol: &str, response: Result<QuoteFeed, TraderError>) -> Self {
        self.responses
            .borrow_mut()
            .entry(symbol.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn with_series(self, symbol: &str, rows: Vec<DailyClose>) -> Self {
        self.with_response(symbol, Ok(QuoteFeed::Series(rows)))
    }

    pub fn with_rate_limits(mut self, symbol: &str, count: usize) -> Self {
        for _ in 0..count {
            self = self.with_response(symbol, Ok(QuoteFeed::RateLimited));
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn keys_used(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(_, k)| k.clone()).collect()
    }
}

impl QuotePort for ScriptedQuotePort {
    fn fetch_daily_series(&self, symbol: &str, api_key: &str) -> Result<QuoteFeed, TraderError> {
        self.calls
            .borrow_mut()
            .push((symbol.to_string(), api_key.to_string()));
        self.responses
            .borrow_mut()
            .get_mut(symbol)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(TraderError::SourceUnavailable {
                    symbol: symbol.to_string(),
                    reason: "no scripted response".to_string(),
                })
            })
    }
}

/// Price lookup backed by an explicit `(symbol, date) -> close` table.
/// Anything not in the table has no session.
pub struct MapPrices {
    pub prices: HashMap<(String, NaiveDate), Decimal>,
    pub lookups: usize,
}

impl MapPrices {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            lookups: 0,
        }
    }

    pub fn with_price(mut self, symbol: &str, date: NaiveDate, close: Decimal) -> Self {
        self.prices.insert((symbol.to_string(), date), close);
        self
    }
}

impl PricePort for MapPrices {
    fn price_on(&mut self, symbol: &str, date: NaiveDate) -> Result<Money, TraderError> {
        self.lookups += 1;
        match self.prices.get(&(symbol.to_string(), date)) {
            Some(close) => Money::new(*close),
            None => Err(TraderError::NoTradingData {
                symbol: symbol.to_string(),
                date,
            }),
        }
    }
}
