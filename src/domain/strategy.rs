//! Capital-allocation strategies.
//!
//! A [`WeightedAllocation`] splits one capital amount across symbols on a
//! single date. A [`DollarCostAveraging`] plan repeats that allocation at a
//! fixed calendar frequency, shifting a scheduled date forward one day at a
//! time while it lands on a day without a session.

use log::{debug, info};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;

use super::calendar::{Frequency, TradeDate};
use super::error::TraderError;
use super::lot::Lot;
use super::money::Money;
use super::portfolio::Portfolio;
use super::weights::WeightMap;
use crate::ports::price_port::PricePort;

/// What one strategy application bought.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Dates an allocation actually executed on, in order.
    pub investment_dates: Vec<TradeDate>,
    pub lots_bought: usize,
}

impl ExecutionReport {
    fn record(&mut self, date: TradeDate, lots: usize) {
        self.investment_dates.push(date);
        self.lots_bought += lots;
    }
}

/// Whole shares affordable with `capital * weight` at `unit_price`, rounded
/// down so the allocation never overspends. `None` for a zero price.
pub fn allocate_shares(capital: Money, weight: Decimal, unit_price: Money) -> Option<u64> {
    if unit_price.is_zero() {
        return None;
    }
    capital
        .amount()
        .checked_mul(weight)?
        .checked_div(unit_price.amount())?
        .floor()
        .to_u64()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedAllocation {
    name: String,
    weights: WeightMap,
    investment_date: TradeDate,
    capital: Money,
    commission: Money,
}

impl WeightedAllocation {
    pub fn new(
        name: &str,
        weights: WeightMap,
        investment_date: TradeDate,
        capital: Money,
        commission: Money,
    ) -> Self {
        WeightedAllocation {
            name: name.to_string(),
            weights,
            investment_date,
            capital,
            commission,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weights(&self) -> &WeightMap {
        &self.weights
    }

    pub fn investment_date(&self) -> TradeDate {
        self.investment_date
    }

    pub fn capital(&self) -> Money {
        self.capital
    }

    pub fn commission(&self) -> Money {
        self.commission
    }

    /// Price every symbol, then buy one lot per symbol.
    ///
    /// All quotes are taken before the first purchase, so a failed lookup
    /// leaves `portfolio` untouched. Returns the number of lots bought.
    pub fn execute(
        &self,
        portfolio: &mut Portfolio,
        prices: &mut dyn PricePort,
    ) -> Result<usize, TraderError> {
        let mut orders = Vec::with_capacity(self.weights.len());
        for (symbol, weight) in self.weights.iter() {
            let unit_price = prices.price_on(symbol, self.investment_date)?;
            let shares = allocate_shares(self.capital, weight, unit_price).ok_or_else(|| {
                TraderError::InvalidQuote {
                    symbol: symbol.to_string(),
                    date: self.investment_date,
                    reason: format!("cannot size an order at {}", unit_price),
                }
            })?;
            orders.push(
                Lot::new(symbol, shares, unit_price, self.investment_date)
                    .with_commission(self.commission),
            );
        }

        let bought = orders.len();
        for lot in orders {
            debug!(
                "{}: buying {} {} @ {} on {}",
                self.name, lot.quantity, lot.symbol, lot.unit_price, lot.trade_date
            );
            portfolio.buy(lot);
        }
        Ok(bought)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DollarCostAveraging {
    name: String,
    weights: WeightMap,
    start_date: TradeDate,
    end_date: Option<TradeDate>,
    frequency: Frequency,
    capital_per_investment: Money,
    commission: Money,
    cursor: TradeDate,
}

impl DollarCostAveraging {
    /// `end_date` of `None` leaves the plan open-ended.
    pub fn new(
        name: &str,
        weights: WeightMap,
        start_date: TradeDate,
        end_date: Option<TradeDate>,
        frequency: Frequency,
        capital_per_investment: Money,
        commission: Money,
    ) -> Self {
        DollarCostAveraging {
            name: name.to_string(),
            weights,
            start_date,
            end_date,
            frequency,
            capital_per_investment,
            commission,
            cursor: start_date,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weights(&self) -> &WeightMap {
        &self.weights
    }

    pub fn start_date(&self) -> TradeDate {
        self.start_date
    }

    pub fn end_date(&self) -> Option<TradeDate> {
        self.end_date
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn capital_per_investment(&self) -> Money {
        self.capital_per_investment
    }

    pub fn commission(&self) -> Money {
        self.commission
    }

    /// Resume a stored plan at `cursor` instead of its start date.
    pub fn with_cursor(mut self, cursor: TradeDate) -> Self {
        self.cursor = cursor;
        self
    }

    /// Next date this plan will try to invest on.
    pub fn cursor(&self) -> TradeDate {
        self.cursor
    }

    /// Last date eligible for investment when run on `today`: never today's
    /// still-open session, never past the configured end.
    pub fn effective_end(&self, today: TradeDate) -> TradeDate {
        let yesterday = today.pred_opt().unwrap_or(today);
        match self.end_date {
            Some(end) => end.min(yesterday),
            None => yesterday,
        }
    }

    fn allocation_at(&self, date: TradeDate) -> WeightedAllocation {
        WeightedAllocation::new(
            &self.name,
            self.weights.clone(),
            date,
            self.capital_per_investment,
            self.commission,
        )
    }

    /// Invest on every scheduled date up to [`effective_end`](Self::effective_end).
    ///
    /// A date without a session moves the cursor one calendar day and tries
    /// again without using up a frequency step; the shifted date anchors the
    /// next step. Any other error stops the run, keeping purchases made so
    /// far and leaving the cursor on the failed date.
    pub fn execute(
        &mut self,
        portfolio: &mut Portfolio,
        prices: &mut dyn PricePort,
        today: TradeDate,
    ) -> Result<ExecutionReport, TraderError> {
        let end = self.effective_end(today);
        let mut report = ExecutionReport::default();

        while self.cursor <= end {
            match self.allocation_at(self.cursor).execute(portfolio, prices) {
                Ok(lots) => {
                    report.record(self.cursor, lots);
                    match self.frequency.advance(self.cursor) {
                        Some(next) => self.cursor = next,
                        None => break,
                    }
                }
                Err(e) if e.is_holiday() => {
                    debug!("{}: no session on {}, shifting one day", self.name, self.cursor);
                    match self.cursor.succ_opt() {
                        Some(next) => self.cursor = next,
                        None => break,
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Weighted(WeightedAllocation),
    DollarCostAveraging(DollarCostAveraging),
}

impl Strategy {
    pub fn name(&self) -> &str {
        match self {
            Strategy::Weighted(s) => s.name(),
            Strategy::DollarCostAveraging(s) => s.name(),
        }
    }

    pub fn weights(&self) -> &WeightMap {
        match self {
            Strategy::Weighted(s) => s.weights(),
            Strategy::DollarCostAveraging(s) => s.weights(),
        }
    }

    pub fn commission(&self) -> Money {
        match self {
            Strategy::Weighted(s) => s.commission(),
            Strategy::DollarCostAveraging(s) => s.commission(),
        }
    }

    /// Apply the strategy to `portfolio`. `today` bounds recurring plans.
    pub fn execute(
        &mut self,
        portfolio: &mut Portfolio,
        prices: &mut dyn PricePort,
        today: TradeDate,
    ) -> Result<ExecutionReport, TraderError> {
        let report = match self {
            Strategy::Weighted(s) => {
                let lots = s.execute(portfolio, prices)?;
                let mut report = ExecutionReport::default();
                report.record(s.investment_date(), lots);
                report
            }
            Strategy::DollarCostAveraging(s) => s.execute(portfolio, prices, today)?,
        };
        info!(
            "applied {} to {}: {} lots over {} dates",
            self.name(),
            portfolio.name(),
            report.lots_bought,
            report.investment_dates.len()
        );
        Ok(report)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Weighted(s) => {
                writeln!(f, "Weighted strategy {}", s.name)?;
                writeln!(f, "  Weights:         {}", s.weights)?;
                writeln!(f, "  Capital:         {}", s.capital)?;
                writeln!(f, "  Commission:      {}", s.commission)?;
                write!(f, "  Investment Date: {}", s.investment_date)
            }
            Strategy::DollarCostAveraging(s) => {
                writeln!(f, "Dollar-cost averaging strategy {}", s.name)?;
                writeln!(f, "  Weights:         {}", s.weights)?;
                writeln!(f, "  Capital/Invest:  {}", s.capital_per_investment)?;
                writeln!(f, "  Commission:      {}", s.commission)?;
                writeln!(f, "  Start Date:      {}", s.start_date)?;
                match s.end_date {
                    Some(end) => writeln!(f, "  End Date:        {}", end)?,
                    None => writeln!(f, "  End Date:        NA")?,
                }
                write!(
                    f,
                    "  Frequency:       every {} {}(s)",
                    s.frequency.count, s.frequency.unit
                )
            }
        }
    }
}
