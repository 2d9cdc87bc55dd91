//! Trade dates and investment frequencies.

use chrono::{Days, Months, NaiveDate};
use std::fmt;

use super::error::TraderError;

/// Calendar date of a trading session; no time-of-day component.
pub type TradeDate = NaiveDate;

/// Parse `MM/DD/YYYY` (interactive input) or `YYYY-MM-DD` (stored form).
pub fn parse_trade_date(input: &str) -> Result<TradeDate, TraderError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TraderError::empty("date"));
    }
    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|_| TraderError::InvalidDate {
            input: input.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyUnit {
    Day,
    Week,
    Month,
    Year,
}

impl FrequencyUnit {
    pub fn code(&self) -> char {
        match self {
            FrequencyUnit::Day => 'D',
            FrequencyUnit::Week => 'W',
            FrequencyUnit::Month => 'M',
            FrequencyUnit::Year => 'Y',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "D" => Some(FrequencyUnit::Day),
            "W" => Some(FrequencyUnit::Week),
            "M" => Some(FrequencyUnit::Month),
            "Y" => Some(FrequencyUnit::Year),
            _ => None,
        }
    }
}

impl fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrequencyUnit::Day => "day",
            FrequencyUnit::Week => "week",
            FrequencyUnit::Month => "month",
            FrequencyUnit::Year => "year",
        };
        f.write_str(name)
    }
}

/// A step of `count` units between two scheduled investments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    pub count: u32,
    pub unit: FrequencyUnit,
}

impl Frequency {
    pub fn new(count: u32, unit: FrequencyUnit) -> Result<Self, TraderError> {
        if count == 0 {
            return Err(TraderError::InvalidFrequency {
                input: format!("0{}", unit.code()),
            });
        }
        Ok(Self { count, unit })
    }

    /// Parse the compact form `<count><unit>`, e.g. `1W` or `3M`.
    pub fn parse(input: &str) -> Result<Self, TraderError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TraderError::empty("frequency"));
        }
        let invalid = || TraderError::InvalidFrequency {
            input: input.to_string(),
        };
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (digits, unit) = trimmed.split_at(split);
        let count: u32 = digits.parse().map_err(|_| invalid())?;
        let unit = FrequencyUnit::from_code(unit).ok_or_else(invalid)?;
        Frequency::new(count, unit).map_err(|_| invalid())
    }

    /// The date one step after `date`. Month and year steps clamp to the end
    /// of a shorter target month (Jan 31 + 1M = Feb 28/29).
    pub fn advance(&self, date: TradeDate) -> Option<TradeDate> {
        match self.unit {
            FrequencyUnit::Day => date.checked_add_days(Days::new(self.count as u64)),
            FrequencyUnit::Week => date.checked_add_days(Days::new(7 * self.count as u64)),
            FrequencyUnit::Month => date.checked_add_months(Months::new(self.count)),
            FrequencyUnit::Year => date.checked_add_months(Months::new(12 * self.count)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.code())
    }
}
