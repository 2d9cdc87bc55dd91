//! Raw daily-series feed from an upstream quote provider.

use crate::domain::calendar::TradeDate;
use crate::domain::error::TraderError;
use crate::domain::money::Money;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyClose {
    pub date: TradeDate,
    pub close: Money,
}

/// What one bulk request returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteFeed {
    /// Every available session, newest first.
    Series(Vec<DailyClose>),
    /// The provider throttled the key used for this request.
    RateLimited,
}

pub trait QuotePort {
    /// Fetch the full daily series for `symbol` using `api_key`.
    ///
    /// Fails with `UnknownSymbol` when the provider rejects the ticker and
    /// with `SourceUnavailable` when the request itself fails.
    fn fetch_daily_series(&self, symbol: &str, api_key: &str) -> Result<QuoteFeed, TraderError>;
}
