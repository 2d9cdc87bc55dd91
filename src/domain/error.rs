//! Domain error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Broad family an error belongs to. Callers use this to decide whether a
/// failure is worth retrying and how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required input was missing or empty.
    Validation,
    /// An input string could not be converted (date, number, frequency).
    Parse,
    /// A rule of the ledger was broken (unknown or duplicate name, bad weights).
    Domain,
    /// The price source could not answer.
    MarketData,
    /// Reading or writing stored state failed.
    Storage,
    /// The configuration file is missing, unreadable or inconsistent.
    Config,
}

/// Top-level error type for tradeledger.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("missing required input: {field}")]
    EmptyField { field: String },

    #[error("invalid {field} name '{name}': no path separators or leading dot")]
    InvalidName { field: String, name: String },

    #[error("invalid date '{input}' (expected MM/DD/YYYY or YYYY-MM-DD)")]
    InvalidDate { input: String },

    #[error("invalid {field} '{input}': expected a non-negative integer")]
    InvalidInteger { field: String, input: String },

    #[error("invalid {field} '{input}': expected a decimal amount")]
    InvalidDecimal { field: String, input: String },

    #[error("invalid frequency '{input}' (expected <count><D|W|M|Y>, e.g. 1W)")]
    InvalidFrequency { input: String },

    #[error("invalid weight for {symbol}: '{input}'")]
    InvalidWeight { symbol: String, input: String },

    #[error("{field} cannot be negative: {amount}")]
    NegativeAmount { field: String, amount: Decimal },

    #[error("name already in use: {name}")]
    DuplicateName { name: String },

    #[error("unknown portfolio: {name}")]
    UnknownPortfolio { name: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("weights must sum to between 0.99 and 1.01, got {total}")]
    InvalidWeightMap { total: Decimal },

    #[error("unknown ticker symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("no trading data for {symbol} on {date}")]
    NoTradingData { symbol: String, date: NaiveDate },

    #[error("price source unavailable for {symbol}: {reason}")]
    SourceUnavailable { symbol: String, reason: String },

    #[error("price source exhausted for {symbol} after {attempts} rate-limited attempts")]
    SourceExhausted { symbol: String, attempts: usize },

    #[error("unusable quote for {symbol} on {date}: {reason}")]
    InvalidQuote {
        symbol: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },
}

impl TraderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TraderError::EmptyField { .. } | TraderError::InvalidName { .. } => {
                ErrorClass::Validation
            }
            TraderError::InvalidDate { .. }
            | TraderError::InvalidInteger { .. }
            | TraderError::InvalidDecimal { .. }
            | TraderError::InvalidFrequency { .. }
            | TraderError::InvalidWeight { .. }
            | TraderError::NegativeAmount { .. } => ErrorClass::Parse,
            TraderError::DuplicateName { .. }
            | TraderError::UnknownPortfolio { .. }
            | TraderError::UnknownStrategy { .. }
            | TraderError::InvalidWeightMap { .. } => ErrorClass::Domain,
            TraderError::UnknownSymbol { .. }
            | TraderError::NoTradingData { .. }
            | TraderError::SourceUnavailable { .. }
            | TraderError::SourceExhausted { .. }
            | TraderError::InvalidQuote { .. } => ErrorClass::MarketData,
            TraderError::Storage { .. } => ErrorClass::Storage,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => ErrorClass::Config,
        }
    }

    /// True when the requested date simply had no session (weekend, holiday).
    pub fn is_holiday(&self) -> bool {
        matches!(self, TraderError::NoTradingData { .. })
    }

    /// Process exit status for this error.
    pub fn exit_status(&self) -> u8 {
        match self.class() {
            ErrorClass::Storage => 1,
            ErrorClass::Config => 2,
            ErrorClass::Validation | ErrorClass::Parse => 3,
            ErrorClass::Domain => 4,
            ErrorClass::MarketData => 5,
        }
    }

    pub(crate) fn empty(field: &str) -> Self {
        TraderError::EmptyField {
            field: field.to_string(),
        }
    }

    pub(crate) fn storage(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        TraderError::Storage {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
