//! Immutable purchase records.

use std::fmt;

use super::calendar::TradeDate;
use super::money::Money;

/// One equity purchase: `quantity` shares of `symbol` at `unit_price`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lot {
    pub symbol: String,
    pub quantity: u64,
    pub unit_price: Money,
    pub trade_date: TradeDate,
    pub commission: Money,
}

impl Lot {
    pub fn new(symbol: &str, quantity: u64, unit_price: Money, trade_date: TradeDate) -> Self {
        Lot {
            symbol: symbol.to_string(),
            quantity,
            unit_price,
            trade_date,
            commission: Money::ZERO,
        }
    }

    pub fn with_commission(mut self, commission: Money) -> Self {
        self.commission = commission;
        self
    }

    /// Purchase-time value, excluding commission.
    pub fn total_value(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

impl fmt::Display for Lot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} shares @ {} | value {} | commission {}",
            self.symbol,
            self.trade_date,
            self.quantity,
            self.unit_price,
            self.total_value(),
            self.commission
        )
    }
}
