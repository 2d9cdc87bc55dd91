//! The account: every portfolio and strategy known to a session.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use log::info;

use super::calendar::TradeDate;
use super::error::TraderError;
use super::lot::Lot;
use super::money::Money;
use super::portfolio::Portfolio;
use super::strategy::{ExecutionReport, Strategy};
use crate::ports::price_port::PricePort;

/// Name of the portfolio every account starts with.
pub const DEFAULT_PORTFOLIO: &str = "Investment";

/// Cost basis, commissions and their sum, reported together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CostSummary {
    pub cost_basis: Money,
    pub commission: Money,
    pub total_cost: Money,
}

impl CostSummary {
    fn of(portfolio: &Portfolio) -> Self {
        CostSummary {
            cost_basis: portfolio.cost_basis(),
            commission: portfolio.commission_cost(),
            total_cost: portfolio.total_cost(),
        }
    }

    fn merge(self, other: CostSummary) -> Self {
        CostSummary {
            cost_basis: self.cost_basis + other.cost_basis,
            commission: self.commission + other.commission,
            total_cost: self.total_cost + other.total_cost,
        }
    }
}

impl fmt::Display for CostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cost Basis:      {}", self.cost_basis)?;
        writeln!(f, "Commission Cost: {}", self.commission)?;
        write!(f, "Total Cost:      {}", self.total_cost)
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    portfolios: BTreeMap<String, Portfolio>,
    strategies: BTreeMap<String, Strategy>,
}

impl Default for Account {
    fn default() -> Self {
        Account::new()
    }
}

impl Account {
    /// A fresh account holding only the empty default portfolio.
    pub fn new() -> Self {
        let mut portfolios = BTreeMap::new();
        portfolios.insert(
            DEFAULT_PORTFOLIO.to_string(),
            Portfolio::new(DEFAULT_PORTFOLIO),
        );
        Account {
            portfolios,
            strategies: BTreeMap::new(),
        }
    }

    pub fn create_portfolio(&mut self, name: &str) -> Result<&mut Portfolio, TraderError> {
        match self.portfolios.entry(name.to_string()) {
            Entry::Occupied(_) => Err(TraderError::DuplicateName {
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                info!("created portfolio {}", name);
                Ok(slot.insert(Portfolio::new(name)))
            }
        }
    }

    /// Insert `portfolio`, replacing any portfolio of the same name.
    pub fn insert_portfolio(&mut self, portfolio: Portfolio) {
        self.portfolios
            .insert(portfolio.name().to_string(), portfolio);
    }

    pub fn portfolio(&self, name: &str) -> Result<&Portfolio, TraderError> {
        self.portfolios
            .get(name)
            .ok_or_else(|| TraderError::UnknownPortfolio {
                name: name.to_string(),
            })
    }

    pub fn portfolio_mut(&mut self, name: &str) -> Result<&mut Portfolio, TraderError> {
        self.portfolios
            .get_mut(name)
            .ok_or_else(|| TraderError::UnknownPortfolio {
                name: name.to_string(),
            })
    }

    pub fn portfolios(&self) -> impl Iterator<Item = &Portfolio> {
        self.portfolios.values()
    }

    pub fn portfolio_names(&self) -> impl Iterator<Item = &str> {
        self.portfolios.keys().map(String::as_str)
    }

    pub fn track(&mut self, symbol: &str, portfolio: &str) -> Result<(), TraderError> {
        self.portfolio_mut(portfolio)?.track(symbol);
        Ok(())
    }

    pub fn buy(&mut self, lot: Lot, portfolio: &str) -> Result<(), TraderError> {
        self.portfolio_mut(portfolio)?.buy(lot);
        Ok(())
    }

    pub fn evaluate_portfolio(
        &self,
        name: &str,
        date: TradeDate,
        prices: &mut dyn PricePort,
    ) -> Result<Money, TraderError> {
        self.portfolio(name)?.evaluate(date, prices)
    }

    /// Market value of every portfolio at `date`.
    pub fn evaluate(
        &self,
        date: TradeDate,
        prices: &mut dyn PricePort,
    ) -> Result<Money, TraderError> {
        let mut total = Money::ZERO;
        for portfolio in self.portfolios.values() {
            total = total + portfolio.evaluate(date, prices)?;
        }
        Ok(total)
    }

    pub fn portfolio_costs(&self, name: &str) -> Result<CostSummary, TraderError> {
        self.portfolio(name).map(CostSummary::of)
    }

    pub fn costs(&self) -> CostSummary {
        self.portfolios
            .values()
            .map(CostSummary::of)
            .fold(CostSummary::default(), CostSummary::merge)
    }

    pub fn add_strategy(&mut self, strategy: Strategy) -> Result<(), TraderError> {
        match self.strategies.entry(strategy.name().to_string()) {
            Entry::Occupied(_) => Err(TraderError::DuplicateName {
                name: strategy.name().to_string(),
            }),
            Entry::Vacant(slot) => {
                info!("added strategy {}", strategy.name());
                slot.insert(strategy);
                Ok(())
            }
        }
    }

    /// Insert `strategy`, replacing any strategy of the same name.
    pub fn insert_strategy(&mut self, strategy: Strategy) {
        self.strategies
            .insert(strategy.name().to_string(), strategy);
    }

    pub fn strategy(&self, name: &str) -> Result<&Strategy, TraderError> {
        self.strategies
            .get(name)
            .ok_or_else(|| TraderError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    pub fn strategies(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.values()
    }

    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    /// Run strategy `strategy` against portfolio `portfolio`, creating the
    /// portfolio first when it does not exist yet.
    ///
    /// The strategy is looked up before anything is created, so an unknown
    /// strategy name leaves the account unchanged.
    pub fn apply_strategy(
        &mut self,
        strategy: &str,
        portfolio: &str,
        prices: &mut dyn PricePort,
        today: TradeDate,
    ) -> Result<ExecutionReport, TraderError> {
        let strategy = self
            .strategies
            .get_mut(strategy)
            .ok_or_else(|| TraderError::UnknownStrategy {
                name: strategy.to_string(),
            })?;
        let target = self
            .portfolios
            .entry(portfolio.to_string())
            .or_insert_with(|| Portfolio::new(portfolio));
        strategy.execute(target, prices, today)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for portfolio in self.portfolios.values() {
            if !first {
                f.write_str("\n\n")?;
            }
            first = false;
            write!(f, "{}", portfolio)?;
        }
        Ok(())
    }
}
