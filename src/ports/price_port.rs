//! Historical closing-price lookup.

use crate::domain::calendar::TradeDate;
use crate::domain::error::TraderError;
use crate::domain::money::Money;

/// Answers "what did `symbol` close at on `date`?".
///
/// Implementations must match the session date exactly: a date with no
/// session fails with [`TraderError::NoTradingData`] rather than falling
/// back to a neighbouring day. Lookups take `&mut self` so an implementation
/// can keep a cache.
pub trait PricePort {
    fn price_on(&mut self, symbol: &str, date: TradeDate) -> Result<Money, TraderError>;
}
