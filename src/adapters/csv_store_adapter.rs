//! Flat CSV storage for portfolios and strategies.
//!
//! Layout under the storage root:
//!
//! ```text
//! Portfolios/<name>/equityNames.csv   TickerSymbol
//! Portfolios/<name>/equities.csv      TickerSymbol,TradeTime,UnitPrice,Shares,Commission
//! Strategies/<name>.csv               one header row, one strategy row
//! ```
//!
//! A DCA row ends with the plan's next investment date. Files written
//! without that column resume from the start date.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use rust_decimal::Decimal;

use crate::domain::calendar::{Frequency, FrequencyUnit, parse_trade_date};
use crate::domain::error::TraderError;
use crate::domain::lot::Lot;
use crate::domain::money::Money;
use crate::domain::portfolio::Portfolio;
use crate::domain::strategy::{DollarCostAveraging, Strategy, WeightedAllocation};
use crate::domain::trader::OPEN_END;
use crate::domain::weights::WeightMap;
use crate::ports::store_port::StorePort;

const PORTFOLIO_DIR: &str = "Portfolios";
const STRATEGY_DIR: &str = "Strategies";
const SYMBOLS_FILE: &str = "equityNames.csv";
const LOTS_FILE: &str = "equities.csv";

const SYMBOLS_HEADER: [&str; 1] = ["TickerSymbol"];
const LOTS_HEADER: [&str; 5] = ["TickerSymbol", "TradeTime", "UnitPrice", "Shares", "Commission"];
const WEIGHTED_HEADER: [&str; 5] = [
    "StrategyType",
    "StockWeights",
    "InvestmentTime",
    "Capital",
    "Commission",
];
const DCA_HEADER: [&str; 9] = [
    "StrategyType",
    "StockWeights",
    "StartTime",
    "EndTime",
    "FrequencyType",
    "Frequency",
    "CapitalPerInvestment",
    "Commission",
    "NextInvestmentTime",
];

const WEIGHTED_TAG: &str = "WeightedInvestment";
const DCA_TAG: &str = "DACInvestment";

pub struct CsvStoreAdapter {
    root: PathBuf,
}

impl CsvStoreAdapter {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn portfolio_dir(&self, name: &str) -> PathBuf {
        self.root.join(PORTFOLIO_DIR).join(name)
    }

    fn strategy_path(&self, name: &str) -> PathBuf {
        self.root.join(STRATEGY_DIR).join(format!("{}.csv", name))
    }

    fn write_rows<const N: usize>(
        path: &Path,
        header: [&str; N],
        rows: Vec<Vec<String>>,
    ) -> Result<(), TraderError> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| TraderError::storage(path.display(), e))?;
        wtr.write_record(header)
            .map_err(|e| TraderError::storage(path.display(), e))?;
        for row in rows {
            wtr.write_record(&row)
                .map_err(|e| TraderError::storage(path.display(), e))?;
        }
        wtr.flush()
            .map_err(|e| TraderError::storage(path.display(), e))
    }

    /// Data rows of a file written by [`write_rows`](Self::write_rows).
    fn read_rows(path: &Path) -> Result<Vec<csv::StringRecord>, TraderError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| TraderError::storage(path.display(), e))?;
        rdr.records()
            .map(|r| r.map_err(|e| TraderError::storage(path.display(), e)))
            .filter(|r| !matches!(r, Ok(rec) if rec.iter().all(str::is_empty)))
            .collect()
    }

    fn list_dir(dir: &Path) -> Result<Vec<fs::DirEntry>, TraderError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        fs::read_dir(dir)
            .map_err(|e| TraderError::storage(dir.display(), e))?
            .map(|entry| entry.map_err(|e| TraderError::storage(dir.display(), e)))
            .collect()
    }
}

fn field<'a>(record: &'a csv::StringRecord, index: usize, name: &str, path: &Path) -> Result<&'a str, TraderError> {
    record
        .get(index)
        .ok_or_else(|| TraderError::storage(path.display(), format!("missing {} column", name)))
}

fn money_field(record: &csv::StringRecord, index: usize, name: &str, path: &Path) -> Result<Money, TraderError> {
    let raw = field(record, index, name, path)?;
    Decimal::from_str(raw)
        .ok()
        .and_then(|d| Money::new(d).ok())
        .ok_or_else(|| TraderError::storage(path.display(), format!("invalid {} '{}'", name, raw)))
}

fn strategy_row(strategy: &Strategy) -> Vec<String> {
    match strategy {
        Strategy::Weighted(s) => vec![
            WEIGHTED_TAG.to_string(),
            s.weights().encode(),
            s.investment_date().to_string(),
            s.capital().amount().to_string(),
            s.commission().amount().to_string(),
        ],
        Strategy::DollarCostAveraging(s) => vec![
            DCA_TAG.to_string(),
            s.weights().encode(),
            s.start_date().to_string(),
            s.end_date()
                .map_or_else(|| OPEN_END.to_string(), |d| d.to_string()),
            s.frequency().unit.code().to_string(),
            s.frequency().count.to_string(),
            s.capital_per_investment().amount().to_string(),
            s.commission().amount().to_string(),
            s.cursor().to_string(),
        ],
    }
}

fn parse_strategy(name: &str, record: &csv::StringRecord, path: &Path) -> Result<Strategy, TraderError> {
    let bad = |reason: String| TraderError::storage(path.display(), reason);
    let tag = field(record, 0, "StrategyType", path)?;
    let weights = WeightMap::decode(field(record, 1, "StockWeights", path)?)
        .map_err(|e| bad(e.to_string()))?;

    match tag {
        WEIGHTED_TAG => {
            let date = parse_trade_date(field(record, 2, "InvestmentTime", path)?)
                .map_err(|e| bad(e.to_string()))?;
            Ok(Strategy::Weighted(WeightedAllocation::new(
                name,
                weights,
                date,
                money_field(record, 3, "Capital", path)?,
                money_field(record, 4, "Commission", path)?,
            )))
        }
        DCA_TAG => {
            let start = parse_trade_date(field(record, 2, "StartTime", path)?)
                .map_err(|e| bad(e.to_string()))?;
            let end = match field(record, 3, "EndTime", path)? {
                OPEN_END => None,
                raw => Some(parse_trade_date(raw).map_err(|e| bad(e.to_string()))?),
            };
            let unit_code = field(record, 4, "FrequencyType", path)?;
            let unit = FrequencyUnit::from_code(unit_code)
                .ok_or_else(|| bad(format!("invalid FrequencyType '{}'", unit_code)))?;
            let count_raw = field(record, 5, "Frequency", path)?;
            let count: u32 = count_raw
                .parse()
                .map_err(|_| bad(format!("invalid Frequency '{}'", count_raw)))?;
            let frequency = Frequency::new(count, unit).map_err(|e| bad(e.to_string()))?;
            let plan = DollarCostAveraging::new(
                name,
                weights,
                start,
                end,
                frequency,
                money_field(record, 6, "CapitalPerInvestment", path)?,
                money_field(record, 7, "Commission", path)?,
            );
            let plan = match record.get(8).filter(|raw| !raw.is_empty()) {
                Some(raw) => plan.with_cursor(parse_trade_date(raw).map_err(|e| bad(e.to_string()))?),
                None => plan,
            };
            Ok(Strategy::DollarCostAveraging(plan))
        }
        other => Err(bad(format!("unknown strategy type '{}'", other))),
    }
}

impl StorePort for CsvStoreAdapter {
    fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), TraderError> {
        let dir = self.portfolio_dir(portfolio.name());
        fs::create_dir_all(&dir).map_err(|e| TraderError::storage(dir.display(), e))?;

        let symbols = portfolio.symbols().map(|s| vec![s.to_string()]).collect();
        Self::write_rows(&dir.join(SYMBOLS_FILE), SYMBOLS_HEADER, symbols)?;

        let lots = portfolio
            .lots()
            .map(|lot| {
                vec![
                    lot.symbol.clone(),
                    lot.trade_date.to_string(),
                    lot.unit_price.amount().to_string(),
                    lot.quantity.to_string(),
                    lot.commission.amount().to_string(),
                ]
            })
            .collect();
        Self::write_rows(&dir.join(LOTS_FILE), LOTS_HEADER, lots)?;
        debug!("wrote portfolio {} to {}", portfolio.name(), dir.display());
        Ok(())
    }

    fn load_portfolio(&self, name: &str) -> Result<Portfolio, TraderError> {
        let dir = self.portfolio_dir(name);
        if !dir.is_dir() {
            return Err(TraderError::storage(dir.display(), "no stored portfolio"));
        }
        let mut portfolio = Portfolio::new(name);

        let symbols_path = dir.join(SYMBOLS_FILE);
        for record in Self::read_rows(&symbols_path)? {
            portfolio.track(field(&record, 0, "TickerSymbol", &symbols_path)?);
        }

        let lots_path = dir.join(LOTS_FILE);
        for record in Self::read_rows(&lots_path)? {
            let symbol = field(&record, 0, "TickerSymbol", &lots_path)?;
            let date = parse_trade_date(field(&record, 1, "TradeTime", &lots_path)?)
                .map_err(|e| TraderError::storage(lots_path.display(), e))?;
            let unit_price = money_field(&record, 2, "UnitPrice", &lots_path)?;
            let raw_shares = field(&record, 3, "Shares", &lots_path)?;
            let quantity: u64 = raw_shares.parse().map_err(|_| {
                TraderError::storage(lots_path.display(), format!("invalid Shares '{}'", raw_shares))
            })?;
            let commission = money_field(&record, 4, "Commission", &lots_path)?;
            portfolio.buy(Lot::new(symbol, quantity, unit_price, date).with_commission(commission));
        }
        Ok(portfolio)
    }

    fn list_portfolios(&self) -> Result<Vec<String>, TraderError> {
        let mut names: Vec<String> = Self::list_dir(&self.root.join(PORTFOLIO_DIR))?
            .into_iter()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }

    fn save_strategy(&self, strategy: &Strategy) -> Result<(), TraderError> {
        let dir = self.root.join(STRATEGY_DIR);
        fs::create_dir_all(&dir).map_err(|e| TraderError::storage(dir.display(), e))?;
        let path = self.strategy_path(strategy.name());
        let row = strategy_row(strategy);
        match strategy {
            Strategy::Weighted(_) => Self::write_rows(&path, WEIGHTED_HEADER, vec![row])?,
            Strategy::DollarCostAveraging(_) => Self::write_rows(&path, DCA_HEADER, vec![row])?,
        }
        debug!("wrote strategy {} to {}", strategy.name(), path.display());
        Ok(())
    }

    fn load_strategy(&self, name: &str) -> Result<Strategy, TraderError> {
        let path = self.strategy_path(name);
        if !path.is_file() {
            return Err(TraderError::storage(path.display(), "no stored strategy"));
        }
        let rows = Self::read_rows(&path)?;
        let record = rows
            .first()
            .ok_or_else(|| TraderError::storage(path.display(), "empty strategy file"))?;
        parse_strategy(name, record, &path)
    }

    fn list_strategies(&self) -> Result<Vec<String>, TraderError> {
        let mut names: Vec<String> = Self::list_dir(&self.root.join(STRATEGY_DIR))?
            .into_iter()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|stem| !stem.starts_with('.'))
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn money(amount: Decimal) -> Money {
        Money::new(amount).unwrap()
    }

    fn half_half() -> WeightMap {
        WeightMap::from_pairs(&[("AAPL", "50%"), ("FB", "50%")]).unwrap()
    }

    fn sample_portfolio() -> Portfolio {
        let mut p = Portfolio::new("Tech");
        p.track("MSFT");
        p.buy(Lot::new("FB", 500, money(dec!(141.55)), d(2018, 11, 12)).with_commission(money(dec!(3.5))));
        p.buy(Lot::new("FB", 10, money(dec!(139.53)), d(2018, 11, 13)));
        p.buy(Lot::new("GOOG", 250, money(dec!(1049.51)), d(2018, 10, 24)));
        p
    }

    mod portfolios {
        use super::*;

        #[test]
        fn save_then_load_reproduces_lots_and_tracked_symbols() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            let original = sample_portfolio();

            store.save_portfolio(&original).unwrap();
            let loaded = store.load_portfolio("Tech").unwrap();

            assert_eq!(loaded, original);
            assert_eq!(loaded.commission_cost().amount(), dec!(3.5));
            assert!(dir.path().join("Portfolios/Tech/equityNames.csv").is_file());
        }

        #[test]
        fn writes_documented_header() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            store.save_portfolio(&sample_portfolio()).unwrap();
            let content = fs::read_to_string(dir.path().join("Portfolios/Tech/equities.csv")).unwrap();
            let lines: Vec<&str> = content.lines().collect();
            assert_eq!(lines[0], "TickerSymbol,TradeTime,UnitPrice,Shares,Commission");
            assert!(lines.contains(&"FB,2018-11-12,141.55,500,3.5"));
        }

        #[test]
        fn saving_again_overwrites() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            let mut p = sample_portfolio();
            store.save_portfolio(&p).unwrap();
            p.buy(Lot::new("AAPL", 1, money(dec!(192.23)), d(2018, 11, 12)));
            store.save_portfolio(&p).unwrap();
            assert_eq!(store.load_portfolio("Tech").unwrap().lot_count(), 4);
        }

        #[test]
        fn list_is_sorted_and_empty_without_root() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path().join("missing"));
            assert!(store.list_portfolios().unwrap().is_empty());

            let store = CsvStoreAdapter::new(dir.path());
            store.save_portfolio(&Portfolio::new("Zeta")).unwrap();
            store.save_portfolio(&Portfolio::new("Alpha")).unwrap();
            assert_eq!(store.list_portfolios().unwrap(), vec!["Alpha", "Zeta"]);
        }

        #[test]
        fn load_missing_portfolio_is_storage_error() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            assert!(matches!(
                store.load_portfolio("Nope"),
                Err(TraderError::Storage { .. })
            ));
        }

        #[test]
        fn corrupt_lot_row_is_storage_error() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            store.save_portfolio(&Portfolio::new("Bad")).unwrap();
            fs::write(
                dir.path().join("Portfolios/Bad/equities.csv"),
                "TickerSymbol,TradeTime,UnitPrice,Shares,Commission\nAAPL,2018-11-12,abc,1,0\n",
            )
            .unwrap();
            assert!(matches!(
                store.load_portfolio("Bad"),
                Err(TraderError::Storage { .. })
            ));
        }
    }

    mod strategies {
        use super::*;

        #[test]
        fn weighted_round_trip() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            let strategy = Strategy::Weighted(WeightedAllocation::new(
                "Split",
                half_half(),
                d(2018, 11, 12),
                money(dec!(20000.00)),
                money(dec!(3.00)),
            ));
            store.save_strategy(&strategy).unwrap();

            let content = fs::read_to_string(dir.path().join("Strategies/Split.csv")).unwrap();
            assert_eq!(
                content.lines().collect::<Vec<_>>(),
                vec![
                    "StrategyType,StockWeights,InvestmentTime,Capital,Commission",
                    "WeightedInvestment,AAPL=0.5&FB=0.5,2018-11-12,20000.00,3.00",
                ]
            );
            assert_eq!(store.load_strategy("Split").unwrap(), strategy);
        }

        #[test]
        fn open_ended_dca_round_trip() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            let strategy = Strategy::DollarCostAveraging(DollarCostAveraging::new(
                "Weekly",
                half_half(),
                d(2018, 11, 1),
                None,
                Frequency::new(2, FrequencyUnit::Week).unwrap(),
                money(dec!(1000)),
                money(dec!(1)),
            ));
            store.save_strategy(&strategy).unwrap();

            let content = fs::read_to_string(dir.path().join("Strategies/Weekly.csv")).unwrap();
            assert!(content
                .lines()
                .any(|l| l == "DACInvestment,AAPL=0.5&FB=0.5,2018-11-01,NA,W,2,1000,1,2018-11-01"));
            assert_eq!(store.load_strategy("Weekly").unwrap(), strategy);
        }

        #[test]
        fn dca_cursor_survives_round_trip() {
            let dir = TempDir::new().unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            let plan = DollarCostAveraging::new(
                "Weekly",
                half_half(),
                d(2018, 11, 12),
                None,
                Frequency::new(1, FrequencyUnit::Week).unwrap(),
                money(dec!(1000)),
                money(dec!(1)),
            )
            .with_cursor(d(2018, 12, 3));
            store.save_strategy(&Strategy::DollarCostAveraging(plan)).unwrap();

            let Strategy::DollarCostAveraging(loaded) = store.load_strategy("Weekly").unwrap() else {
                panic!("expected a DCA plan");
            };
            assert_eq!(loaded.cursor(), d(2018, 12, 3));
            assert_eq!(loaded.start_date(), d(2018, 11, 12));
        }

        #[test]
        fn reads_legacy_weight_encoding() {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("Strategies")).unwrap();
            fs::write(
                dir.path().join("Strategies/Old.csv"),
                "StrategyType,StockWeights,StartTime,EndTime,FrequencyType,Frequency,CapitalPerInvestment,Commission\n\
                 DACInvestment,{AAPL=0.5& FB=0.5},2018-11-01,2018-12-01,M,1,500,2\n",
            )
            .unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            let Strategy::DollarCostAveraging(plan) = store.load_strategy("Old").unwrap() else {
                panic!("expected a DCA plan");
            };
            assert_eq!(plan.end_date(), Some(d(2018, 12, 1)));
            assert_eq!(plan.cursor(), d(2018, 11, 1));
            assert_eq!(plan.frequency().unit, FrequencyUnit::Month);
            assert_eq!(plan.weights(), &half_half());
        }

        #[test]
        fn unknown_type_is_storage_error() {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("Strategies")).unwrap();
            fs::write(
                dir.path().join("Strategies/Odd.csv"),
                "StrategyType,StockWeights\nMomentum,AAPL=1\n",
            )
            .unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            assert!(matches!(
                store.load_strategy("Odd"),
                Err(TraderError::Storage { .. })
            ));
        }

        #[test]
        fn list_ignores_non_csv_files() {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("Strategies")).unwrap();
            fs::write(dir.path().join("Strategies/notes.txt"), "x").unwrap();
            fs::write(dir.path().join("Strategies/.swap.csv"), "").unwrap();
            fs::write(dir.path().join("Strategies/B.csv"), "").unwrap();
            fs::write(dir.path().join("Strategies/A.csv"), "").unwrap();
            let store = CsvStoreAdapter::new(dir.path());
            assert_eq!(store.list_strategies().unwrap(), vec!["A", "B"]);
        }
    }
}
