//! String-in, typed-out facade over the account.
//!
//! Front ends hand every value over as text. This layer checks for blanks,
//! parses dates, amounts and weights, and only then touches the account, so
//! a rejected call leaves no trace.

use log::info;

use super::account::{Account, CostSummary};
use super::calendar::{Frequency, TradeDate, parse_trade_date};
use super::error::TraderError;
use super::lot::Lot;
use super::money::Money;
use super::strategy::{DollarCostAveraging, ExecutionReport, Strategy, WeightedAllocation};
use super::weights::WeightMap;
use crate::ports::price_port::PricePort;
use crate::ports::store_port::StorePort;

/// End-date marker for a plan without an end.
pub const OPEN_END: &str = "NA";

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, TraderError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TraderError::empty(field));
    }
    Ok(trimmed)
}

/// A portfolio or strategy name. Names become file and directory names in
/// storage, so they may not contain path separators or start with a dot.
fn require_name<'a>(field: &str, value: &'a str) -> Result<&'a str, TraderError> {
    let name = require(field, value)?;
    if name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(TraderError::InvalidName {
            field: field.to_string(),
            name: name.to_string(),
        });
    }
    Ok(name)
}

/// Parse a share count: a non-negative whole number.
pub fn parse_shares(input: &str) -> Result<u64, TraderError> {
    let trimmed = require("shares", input)?;
    trimmed.parse().map_err(|_| TraderError::InvalidInteger {
        field: "shares".to_string(),
        input: input.to_string(),
    })
}

pub struct Trader<P: PricePort, S: StorePort> {
    account: Account,
    prices: P,
    store: S,
    today: Option<TradeDate>,
}

impl<P: PricePort, S: StorePort> Trader<P, S> {
    pub fn new(prices: P, store: S) -> Self {
        Trader {
            account: Account::new(),
            prices,
            store,
            today: None,
        }
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: TradeDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> TradeDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn prices(&self) -> &P {
        &self.prices
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create_portfolio(&mut self, name: &str) -> Result<(), TraderError> {
        let name = require_name("portfolio", name)?;
        self.account.create_portfolio(name)?;
        Ok(())
    }

    pub fn track_symbol(&mut self, symbol: &str, portfolio: &str) -> Result<(), TraderError> {
        let symbol = require("symbol", symbol)?;
        let portfolio = require("portfolio", portfolio)?;
        self.account.track(symbol, portfolio)
    }

    /// Buy `shares` of `symbol` at its close on `date`, without commission.
    pub fn buy(
        &mut self,
        symbol: &str,
        shares: &str,
        date: &str,
        portfolio: &str,
    ) -> Result<Lot, TraderError> {
        self.buy_with_commission(symbol, shares, date, portfolio, "0")
    }

    pub fn buy_with_commission(
        &mut self,
        symbol: &str,
        shares: &str,
        date: &str,
        portfolio: &str,
        commission: &str,
    ) -> Result<Lot, TraderError> {
        let symbol = require("symbol", symbol)?;
        require("shares", shares)?;
        require("date", date)?;
        let portfolio = require("portfolio", portfolio)?;
        require("commission", commission)?;

        let quantity = parse_shares(shares)?;
        let date = parse_trade_date(date)?;
        let commission = Money::parse("commission", commission)?;
        self.account.portfolio(portfolio)?;

        let unit_price = self.prices.price_on(symbol, date)?;
        let lot = Lot::new(symbol, quantity, unit_price, date).with_commission(commission);
        self.account.buy(lot.clone(), portfolio)?;
        info!("bought {} {} @ {} into {}", quantity, symbol, unit_price, portfolio);
        Ok(lot)
    }

    pub fn evaluate_portfolio(&mut self, date: &str, portfolio: &str) -> Result<Money, TraderError> {
        require("date", date)?;
        let portfolio = require("portfolio", portfolio)?;
        let date = parse_trade_date(date)?;
        self.account
            .evaluate_portfolio(portfolio, date, &mut self.prices)
    }

    pub fn evaluate_account(&mut self, date: &str) -> Result<Money, TraderError> {
        let date = parse_trade_date(require("date", date)?)?;
        self.account.evaluate(date, &mut self.prices)
    }

    pub fn portfolio_cost_basis(&self, portfolio: &str) -> Result<CostSummary, TraderError> {
        self.account
            .portfolio_costs(require("portfolio", portfolio)?)
    }

    pub fn account_cost_basis(&self) -> CostSummary {
        self.account.costs()
    }

    /// Register a one-shot allocation. `weights` pairs a symbol with a
    /// percentage (`"50%"`) or a fraction (`"0.5"`).
    pub fn add_weighted_allocation<W: AsRef<str>>(
        &mut self,
        name: &str,
        weights: &[(W, W)],
        capital: &str,
        commission: &str,
        date: &str,
    ) -> Result<(), TraderError> {
        let name = require_name("strategy", name)?;
        require("capital", capital)?;
        require("commission", commission)?;
        require("date", date)?;

        let weights = WeightMap::from_pairs(weights)?;
        let capital = Money::parse("capital", capital)?;
        let commission = Money::parse("commission", commission)?;
        let date = parse_trade_date(date)?;

        self.account.add_strategy(Strategy::Weighted(WeightedAllocation::new(
            name, weights, date, capital, commission,
        )))
    }

    /// Register a recurring plan. `end` of `"NA"` leaves it open-ended.
    #[allow(clippy::too_many_arguments)]
    pub fn add_dollar_cost_averaging<W: AsRef<str>>(
        &mut self,
        name: &str,
        weights: &[(W, W)],
        capital_per_investment: &str,
        commission: &str,
        start: &str,
        end: &str,
        frequency: &str,
    ) -> Result<(), TraderError> {
        let name = require_name("strategy", name)?;
        require("capital", capital_per_investment)?;
        require("commission", commission)?;
        require("start date", start)?;
        let end = require("end date", end)?;
        require("frequency", frequency)?;

        let weights = WeightMap::from_pairs(weights)?;
        let capital = Money::parse("capital", capital_per_investment)?;
        let commission = Money::parse("commission", commission)?;
        let start = parse_trade_date(start)?;
        let end = if end.eq_ignore_ascii_case(OPEN_END) {
            None
        } else {
            Some(parse_trade_date(end)?)
        };
        let frequency = Frequency::parse(frequency)?;

        self.account
            .add_strategy(Strategy::DollarCostAveraging(DollarCostAveraging::new(
                name, weights, start, end, frequency, capital, commission,
            )))
    }

    pub fn apply_strategy(
        &mut self,
        strategy: &str,
        portfolio: &str,
    ) -> Result<ExecutionReport, TraderError> {
        let strategy = require("strategy", strategy)?;
        let portfolio = require_name("portfolio", portfolio)?;
        let today = self.today();
        self.account
            .apply_strategy(strategy, portfolio, &mut self.prices, today)
    }

    pub fn view_account(&self) -> String {
        self.account.to_string()
    }

    pub fn view_portfolio(&self, portfolio: &str) -> Result<String, TraderError> {
        Ok(self
            .account
            .portfolio(require("portfolio", portfolio)?)?
            .to_string())
    }

    pub fn view_strategies(&self) -> String {
        self.account
            .strategies()
            .map(Strategy::to_string)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn portfolio_names(&self) -> Vec<String> {
        self.account.portfolio_names().map(str::to_string).collect()
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.account.strategy_names().map(str::to_string).collect()
    }

    pub fn save_portfolio(&self, name: &str) -> Result<(), TraderError> {
        let portfolio = self.account.portfolio(require("portfolio", name)?)?;
        self.store.save_portfolio(portfolio)?;
        info!("saved portfolio {}", portfolio.name());
        Ok(())
    }

    pub fn save_strategy(&self, name: &str) -> Result<(), TraderError> {
        let strategy = self.account.strategy(require("strategy", name)?)?;
        self.store.save_strategy(strategy)?;
        info!("saved strategy {}", strategy.name());
        Ok(())
    }

    pub fn save_all(&self) -> Result<(), TraderError> {
        for portfolio in self.account.portfolios() {
            self.store.save_portfolio(portfolio)?;
        }
        for strategy in self.account.strategies() {
            self.store.save_strategy(strategy)?;
        }
        info!(
            "saved {} portfolios and {} strategies",
            self.account.portfolio_names().count(),
            self.account.strategy_names().count()
        );
        Ok(())
    }

    /// Load portfolio `name` from storage, replacing any in-memory copy.
    pub fn retrieve_portfolio(&mut self, name: &str) -> Result<(), TraderError> {
        let portfolio = self.store.load_portfolio(require_name("portfolio", name)?)?;
        info!("retrieved portfolio {}", portfolio.name());
        self.account.insert_portfolio(portfolio);
        Ok(())
    }

    /// Load strategy `name` from storage, replacing any in-memory copy.
    pub fn retrieve_strategy(&mut self, name: &str) -> Result<(), TraderError> {
        let strategy = self.store.load_strategy(require_name("strategy", name)?)?;
        info!("retrieved strategy {}", strategy.name());
        self.account.insert_strategy(strategy);
        Ok(())
    }

    pub fn retrieve_all(&mut self) -> Result<(), TraderError> {
        for name in self.store.list_portfolios()? {
            self.retrieve_portfolio(&name)?;
        }
        for name in self.store.list_strategies()? {
            self.retrieve_strategy(&name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::Portfolio;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    struct FlatPrices;

    impl PricePort for FlatPrices {
        fn price_on(&mut self, symbol: &str, date: NaiveDate) -> Result<Money, TraderError> {
            match symbol {
                "AAPL" => Money::new(dec!(100)),
                "FB" => Money::new(dec!(50)),
                _ => Err(TraderError::NoTradingData {
                    symbol: symbol.to_string(),
                    date,
                }),
            }
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        portfolios: RefCell<BTreeMap<String, Portfolio>>,
        strategies: RefCell<BTreeMap<String, Strategy>>,
    }

    impl StorePort for MemoryStore {
        fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), TraderError> {
            self.portfolios
                .borrow_mut()
                .insert(portfolio.name().to_string(), portfolio.clone());
            Ok(())
        }

        fn load_portfolio(&self, name: &str) -> Result<Portfolio, TraderError> {
            self.portfolios
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| TraderError::storage(name, "not found"))
        }

        fn list_portfolios(&self) -> Result<Vec<String>, TraderError> {
            Ok(self.portfolios.borrow().keys().cloned().collect())
        }

        fn save_strategy(&self, strategy: &Strategy) -> Result<(), TraderError> {
            self.strategies
                .borrow_mut()
                .insert(strategy.name().to_string(), strategy.clone());
            Ok(())
        }

        fn load_strategy(&self, name: &str) -> Result<Strategy, TraderError> {
            self.strategies
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| TraderError::storage(name, "not found"))
        }

        fn list_strategies(&self) -> Result<Vec<String>, TraderError> {
            Ok(self.strategies.borrow().keys().cloned().collect())
        }
    }

    fn trader() -> Trader<FlatPrices, MemoryStore> {
        Trader::new(FlatPrices, MemoryStore::default())
            .with_today(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap())
    }

    #[test]
    fn buy_prices_lot_from_oracle() {
        let mut t = trader();
        let lot = t
            .buy_with_commission("AAPL", "10", "11/12/2018", "Investment", "3.00")
            .unwrap();
        assert_eq!(lot.unit_price.amount(), dec!(100));
        assert_eq!(t.portfolio_cost_basis("Investment").unwrap().total_cost.amount(), dec!(1003));
    }

    #[test]
    fn blank_inputs_are_validation_errors() {
        let mut t = trader();
        assert!(matches!(t.create_portfolio(" "), Err(TraderError::EmptyField { .. })));
        assert!(matches!(
            t.buy("AAPL", "", "11/12/2018", "Investment"),
            Err(TraderError::EmptyField { .. })
        ));
        assert!(matches!(
            t.apply_strategy("", "Investment"),
            Err(TraderError::EmptyField { .. })
        ));
    }

    #[test]
    fn names_that_would_leave_storage_root_rejected() {
        let mut t = trader();
        for name in ["../../escaped", "a/b", "a\\b", ".hidden", ".."] {
            assert!(
                matches!(t.create_portfolio(name), Err(TraderError::InvalidName { .. })),
                "{name}"
            );
        }
        assert!(matches!(
            t.add_weighted_allocation("../x", &[("AAPL", "100%")], "1000", "0", "11/12/2018"),
            Err(TraderError::InvalidName { .. })
        ));
        assert!(matches!(
            t.add_dollar_cost_averaging("x/y", &[("AAPL", "100%")], "1000", "0", "11/01/2018", "NA", "1W"),
            Err(TraderError::InvalidName { .. })
        ));
        assert!(matches!(t.retrieve_portfolio("../Tech"), Err(TraderError::InvalidName { .. })));
        assert_eq!(t.portfolio_names(), vec!["Investment"]);
        assert!(t.strategy_names().is_empty());

        t.create_portfolio("Tech 2019.v2").unwrap();
    }

    #[test]
    fn apply_into_unsafe_portfolio_name_creates_nothing() {
        let mut t = trader();
        t.add_weighted_allocation("Split", &[("AAPL", "100%")], "1000", "0", "11/12/2018")
            .unwrap();
        assert!(matches!(
            t.apply_strategy("Split", "../out"),
            Err(TraderError::InvalidName { .. })
        ));
        assert_eq!(t.portfolio_names(), vec!["Investment"]);
    }

    #[test]
    fn parse_errors_leave_no_trace() {
        let mut t = trader();
        assert!(matches!(
            t.buy("AAPL", "ten", "11/12/2018", "Investment"),
            Err(TraderError::InvalidInteger { .. })
        ));
        assert!(matches!(
            t.buy("AAPL", "-1", "11/12/2018", "Investment"),
            Err(TraderError::InvalidInteger { .. })
        ));
        assert!(matches!(
            t.buy("AAPL", "1", "2018/13/40", "Investment"),
            Err(TraderError::InvalidDate { .. })
        ));
        assert_eq!(t.account().portfolio("Investment").unwrap().lot_count(), 0);
    }

    #[test]
    fn buy_into_unknown_portfolio_fails() {
        let mut t = trader();
        assert!(matches!(
            t.buy("AAPL", "1", "11/12/2018", "Nope"),
            Err(TraderError::UnknownPortfolio { .. })
        ));
    }

    #[test]
    fn weighted_strategy_end_to_end() {
        let mut t = trader();
        t.add_weighted_allocation(
            "Split",
            &[("AAPL", "50.00%"), ("FB", "50.00%")],
            "2000",
            "1",
            "11/12/2018",
        )
        .unwrap();
        let report = t.apply_strategy("Split", "New").unwrap();
        assert_eq!(report.lots_bought, 2);
        let costs = t.portfolio_cost_basis("New").unwrap();
        assert_eq!(costs.cost_basis.amount(), dec!(2000));
        assert_eq!(costs.commission.amount(), dec!(2));
    }

    #[test]
    fn weights_outside_band_rejected() {
        let mut t = trader();
        let err = t
            .add_weighted_allocation("Bad", &[("AAPL", "50%"), ("FB", "45%")], "2000", "1", "11/12/2018")
            .unwrap_err();
        assert!(matches!(err, TraderError::InvalidWeightMap { .. }));
        assert!(t.strategy_names().is_empty());
    }

    #[test]
    fn dca_accepts_open_end() {
        let mut t = trader();
        t.add_dollar_cost_averaging(
            "Monthly",
            &[("AAPL", "100%")],
            "1000",
            "0",
            "11/01/2018",
            "NA",
            "1M",
        )
        .unwrap();
        assert!(t.view_strategies().contains("End Date:        NA"));
        assert!(matches!(
            t.add_dollar_cost_averaging("Bad", &[("AAPL", "100%")], "1000", "0", "11/01/2018", "NA", "1Q"),
            Err(TraderError::InvalidFrequency { .. })
        ));
    }

    #[test]
    fn save_then_retrieve_replaces_in_memory_copy() {
        let mut t = trader();
        t.create_portfolio("Tech").unwrap();
        t.buy("AAPL", "5", "11/12/2018", "Tech").unwrap();
        t.save_all().unwrap();

        t.buy("FB", "5", "11/12/2018", "Tech").unwrap();
        t.retrieve_all().unwrap();

        let tech = t.account().portfolio("Tech").unwrap();
        assert_eq!(tech.lot_count(), 1);
        assert_eq!(t.portfolio_names(), vec!["Investment", "Tech"]);
    }

    #[test]
    fn parse_shares_accepts_zero() {
        assert_eq!(parse_shares("0").unwrap(), 0);
        assert_eq!(parse_shares(" 42 ").unwrap(), 42);
    }
}
