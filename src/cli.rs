//! CLI definition and dispatch.
//!
//! Every invocation loads the stored account, runs one command and writes
//! the account back.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::alpha_vantage_adapter::{AlphaVantageAdapter, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::adapters::csv_store_adapter::CsvStoreAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::account::DEFAULT_PORTFOLIO;
use crate::domain::calendar::parse_trade_date;
use crate::domain::config_validation::{validate_oracle_config, validate_storage_config};
use crate::domain::error::TraderError;
use crate::domain::oracle::{DEFAULT_COOLDOWN, OracleSettings, PriceOracle};
use crate::domain::trader::{OPEN_END, Trader};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::store_port::StorePort;

pub const DEFAULT_STORAGE_ROOT: &str = "res";

#[derive(Parser, Debug)]
#[command(name = "tradeledger", about = "Brokerage ledger and investment strategy simulator")]
pub struct Cli {
    #[arg(short, long, default_value = "tradeledger.ini")]
    pub config: PathBuf,
    /// Treat this date (MM/DD/YYYY) as today when bounding recurring strategies
    #[arg(long)]
    pub today: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty portfolio
    CreatePortfolio { name: String },
    /// Track a symbol in a portfolio without buying it
    Track {
        symbol: String,
        #[arg(short, long, default_value = DEFAULT_PORTFOLIO)]
        portfolio: String,
    },
    /// Buy shares at the closing price of a date
    Buy {
        symbol: String,
        shares: String,
        date: String,
        #[arg(short, long, default_value = DEFAULT_PORTFOLIO)]
        portfolio: String,
        #[arg(long, default_value = "0")]
        commission: String,
    },
    /// Market value of a portfolio, or of the whole account, on a date
    Evaluate {
        date: String,
        #[arg(short, long)]
        portfolio: Option<String>,
    },
    /// Cost basis and commission of a portfolio, or of the whole account
    CostBasis {
        #[arg(short, long)]
        portfolio: Option<String>,
    },
    /// Show a portfolio, or every portfolio
    View {
        #[arg(short, long)]
        portfolio: Option<String>,
    },
    /// Add a one-shot weighted allocation
    AddWeighted {
        name: String,
        /// e.g. "AAPL=50%,FB=50%"
        #[arg(short, long)]
        weights: String,
        #[arg(long)]
        capital: String,
        #[arg(long, default_value = "0")]
        commission: String,
        #[arg(long)]
        date: String,
    },
    /// Add a recurring dollar-cost averaging plan
    AddDca {
        name: String,
        #[arg(short, long)]
        weights: String,
        #[arg(long)]
        capital: String,
        #[arg(long, default_value = "0")]
        commission: String,
        #[arg(long)]
        start: String,
        #[arg(long, default_value = OPEN_END)]
        end: String,
        /// <count><D|W|M|Y>, e.g. 1W
        #[arg(short, long)]
        frequency: String,
    },
    /// Apply a strategy to a portfolio, creating the portfolio if needed
    Apply { strategy: String, portfolio: String },
    /// List strategies
    Strategies,
}

pub fn run(cli: Cli) -> ExitCode {
    match try_run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load config and stored state, run the command, save state, and return
/// the text to print.
pub fn try_run(cli: Cli) -> Result<String, TraderError> {
    log::debug!("loading config from {}", cli.config.display());
    let config = FileConfigAdapter::from_file(&cli.config)?;
    validate_oracle_config(&config)?;
    validate_storage_config(&config)?;

    let oracle = PriceOracle::new(build_feed(&config)?, build_oracle_settings(&config))?;
    let mut trader = Trader::new(oracle, build_store(&config));
    if let Some(today) = cli.today.as_deref() {
        trader = trader.with_today(parse_trade_date(today)?);
    }

    run_command(&mut trader, cli.command)
}

/// Load all stored state, dispatch `command` and write the state back.
///
/// State is saved even when the command fails: a recurring plan that stops
/// partway keeps the lots it bought and its position in the schedule.
pub fn run_command<P: PricePort, S: StorePort>(
    trader: &mut Trader<P, S>,
    command: Command,
) -> Result<String, TraderError> {
    trader.retrieve_all()?;
    let outcome = dispatch(trader, command);
    match (outcome, trader.save_all()) {
        (Ok(output), Ok(())) => Ok(output),
        (Ok(_), Err(save_err)) => Err(save_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(save_err)) => {
            log::warn!("could not save state after failed command: {save_err}");
            Err(e)
        }
    }
}

fn seconds(config: &dyn ConfigPort, key: &str, default: Duration) -> Duration {
    let secs = config.get_int("oracle", key, default.as_secs() as i64);
    Duration::from_secs(secs.max(0) as u64)
}

pub fn build_oracle_settings(config: &dyn ConfigPort) -> OracleSettings {
    OracleSettings::new(config.get_list("oracle", "api_keys"))
        .with_cooldown(seconds(config, "cooldown_secs", DEFAULT_COOLDOWN))
}

pub fn build_feed(config: &dyn ConfigPort) -> Result<AlphaVantageAdapter, TraderError> {
    let base_url = config
        .get_string("oracle", "base_url")
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    AlphaVantageAdapter::new(&base_url, seconds(config, "timeout_secs", DEFAULT_TIMEOUT))
}

pub fn build_store(config: &dyn ConfigPort) -> CsvStoreAdapter {
    let root = config
        .get_string("storage", "root")
        .unwrap_or_else(|| DEFAULT_STORAGE_ROOT.to_string());
    CsvStoreAdapter::new(root)
}

/// Split `"AAPL=50%,FB=50%"` into symbol/weight pairs.
pub fn parse_weight_args(input: &str) -> Result<Vec<(String, String)>, TraderError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(symbol, weight)| (symbol.trim().to_string(), weight.trim().to_string()))
                .ok_or_else(|| TraderError::InvalidWeight {
                    symbol: entry.to_string(),
                    input: input.to_string(),
                })
        })
        .collect()
}

/// Run one command against an already-loaded trader and render its output.
pub fn dispatch<P: PricePort, S: StorePort>(
    trader: &mut Trader<P, S>,
    command: Command,
) -> Result<String, TraderError> {
    match command {
        Command::CreatePortfolio { name } => {
            trader.create_portfolio(&name)?;
            Ok(format!("Created portfolio {}", name))
        }
        Command::Track { symbol, portfolio } => {
            trader.track_symbol(&symbol, &portfolio)?;
            Ok(format!("Tracking {} in {}", symbol, portfolio))
        }
        Command::Buy {
            symbol,
            shares,
            date,
            portfolio,
            commission,
        } => {
            let lot = trader.buy_with_commission(&symbol, &shares, &date, &portfolio, &commission)?;
            Ok(format!("Bought into {}: {}", portfolio, lot))
        }
        Command::Evaluate { date, portfolio } => match portfolio {
            Some(name) => {
                let value = trader.evaluate_portfolio(&date, &name)?;
                Ok(format!("Value of {} on {}: {}", name, date, value))
            }
            None => {
                let value = trader.evaluate_account(&date)?;
                Ok(format!("Value of account on {}: {}", date, value))
            }
        },
        Command::CostBasis { portfolio } => match portfolio {
            Some(name) => Ok(format!("{}\n{}", name, trader.portfolio_cost_basis(&name)?)),
            None => Ok(format!("Account\n{}", trader.account_cost_basis())),
        },
        Command::View { portfolio } => match portfolio {
            Some(name) => trader.view_portfolio(&name),
            None => Ok(trader.view_account()),
        },
        Command::AddWeighted {
            name,
            weights,
            capital,
            commission,
            date,
        } => {
            let weights = parse_weight_args(&weights)?;
            trader.add_weighted_allocation(&name, &weights, &capital, &commission, &date)?;
            Ok(format!("Added weighted strategy {}", name))
        }
        Command::AddDca {
            name,
            weights,
            capital,
            commission,
            start,
            end,
            frequency,
        } => {
            let weights = parse_weight_args(&weights)?;
            trader.add_dollar_cost_averaging(
                &name,
                &weights,
                &capital,
                &commission,
                &start,
                &end,
                &frequency,
            )?;
            Ok(format!("Added dollar-cost averaging strategy {}", name))
        }
        Command::Apply {
            strategy,
            portfolio,
        } => {
            let report = trader.apply_strategy(&strategy, &portfolio)?;
            let dates: Vec<String> = report
                .investment_dates
                .iter()
                .map(|d| d.to_string())
                .collect();
            Ok(format!(
                "Applied {} to {}: {} lots on [{}]",
                strategy,
                portfolio,
                report.lots_bought,
                dates.join(", ")
            ))
        }
        Command::Strategies => {
            let names = trader.strategy_names();
            if names.is_empty() {
                return Ok("No strategies".to_string());
            }
            Ok(format!(
                "Strategies: {}\n\n{}",
                names.join(", "),
                trader.view_strategies()
            ))
        }
    }
}
