//! Named collections of purchase lots.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use super::calendar::TradeDate;
use super::error::TraderError;
use super::lot::Lot;
use super::money::Money;
use crate::ports::price_port::PricePort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portfolio {
    name: String,
    holdings: BTreeMap<String, Vec<Lot>>,
}

impl Portfolio {
    pub fn new(name: &str) -> Self {
        Portfolio {
            name: name.to_string(),
            holdings: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `symbol` without buying it. Calling it again is a no-op.
    pub fn track(&mut self, symbol: &str) {
        self.holdings.entry(symbol.to_string()).or_default();
    }

    /// Append a lot; earlier lots of the same symbol keep their order.
    pub fn buy(&mut self, lot: Lot) {
        self.holdings.entry(lot.symbol.clone()).or_default().push(lot);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.holdings.keys().map(String::as_str)
    }

    pub fn lots_of(&self, symbol: &str) -> &[Lot] {
        self.holdings.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.holdings.values().flatten()
    }

    pub fn lot_count(&self) -> usize {
        self.holdings.values().map(Vec::len).sum()
    }

    /// Market value at `date` of every lot bought on or before `date`.
    ///
    /// Each included symbol is re-priced at `date`, so a date without a
    /// session fails with `NoTradingData`.
    pub fn evaluate(
        &self,
        date: TradeDate,
        prices: &mut dyn PricePort,
    ) -> Result<Money, TraderError> {
        let mut total = Money::ZERO;
        for (symbol, lots) in &self.holdings {
            let mut held = lots.iter().filter(|lot| lot.trade_date <= date).peekable();
            if held.peek().is_none() {
                continue;
            }
            let shares: u64 = held.map(|lot| lot.quantity).sum();
            let price = prices.price_on(symbol, date)?;
            debug!("{}: {} x {} on {}", symbol, shares, price, date);
            total = total + price.times(shares);
        }
        Ok(total)
    }

    /// Sum of purchase-time lot values.
    pub fn cost_basis(&self) -> Money {
        self.lots().map(Lot::total_value).sum()
    }

    pub fn commission_cost(&self) -> Money {
        self.lots().map(|lot| lot.commission).sum()
    }

    pub fn total_cost(&self) -> Money {
        self.cost_basis() + self.commission_cost()
    }
}

impl fmt::Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Portfolio: {}", self.name)?;
        for (symbol, lots) in &self.holdings {
            write!(f, "\n  {}", symbol)?;
            for (i, lot) in lots.iter().enumerate() {
                write!(f, "\n    {}: {}", i, lot)?;
            }
        }
        write!(f, "\n  Cost Basis:      {}", self.cost_basis())?;
        write!(f, "\n  Commission Cost: {}", self.commission_cost())?;
        write!(f, "\n  Total Cost:      {}", self.total_cost())
    }
}
