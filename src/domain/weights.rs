//! Target allocation weights.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::TraderError;

const MIN_TOTAL_WEIGHT: Decimal = Decimal::from_parts(99, 0, 0, false, 2);
const MAX_TOTAL_WEIGHT: Decimal = Decimal::from_parts(101, 0, 0, false, 2);

/// Symbol → fraction of capital. Weights lie in [0, 1] and their sum lies in
/// [0.99, 1.01].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightMap(BTreeMap<String, Decimal>);

impl WeightMap {
    pub fn new(weights: BTreeMap<String, Decimal>) -> Result<Self, TraderError> {
        for (symbol, weight) in &weights {
            if symbol.trim().is_empty() {
                return Err(TraderError::empty("symbol"));
            }
            if *weight < Decimal::ZERO || *weight > Decimal::ONE {
                return Err(TraderError::InvalidWeight {
                    symbol: symbol.clone(),
                    input: weight.to_string(),
                });
            }
        }
        let total: Decimal = weights.values().copied().sum();
        if total < MIN_TOTAL_WEIGHT || total > MAX_TOTAL_WEIGHT {
            return Err(TraderError::InvalidWeightMap { total });
        }
        Ok(WeightMap(weights))
    }

    /// Build from `(symbol, weight)` string pairs as typed by a user; see
    /// [`parse_weight`] for the accepted weight forms.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[(S, S)]) -> Result<Self, TraderError> {
        if pairs.is_empty() {
            return Err(TraderError::empty("weights"));
        }
        let mut weights = BTreeMap::new();
        for (symbol, weight) in pairs {
            let symbol = symbol.as_ref().trim();
            if symbol.is_empty() {
                return Err(TraderError::empty("symbol"));
            }
            if weights.contains_key(symbol) {
                return Err(TraderError::DuplicateName {
                    name: symbol.to_string(),
                });
            }
            weights.insert(symbol.to_string(), parse_weight(symbol, weight.as_ref())?);
        }
        WeightMap::new(weights)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(s, w)| (s.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    /// Flat `SYM=weight&SYM=weight` form used in strategy files.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(s, w)| format!("{}={}", s, w.normalize()))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Inverse of [`encode`](Self::encode). Also reads the older
    /// `{AAPL=0.5& FB=0.5}` form.
    pub fn decode(encoded: &str) -> Result<Self, TraderError> {
        let body = encoded
            .trim()
            .trim_start_matches('{')
            .trim_end_matches('}');
        let mut weights = BTreeMap::new();
        for entry in body.split('&') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (symbol, weight) =
                entry
                    .split_once('=')
                    .ok_or_else(|| TraderError::InvalidWeight {
                        symbol: entry.to_string(),
                        input: encoded.to_string(),
                    })?;
            let symbol = symbol.trim();
            let weight = Decimal::from_str(weight.trim()).map_err(|_| TraderError::InvalidWeight {
                symbol: symbol.to_string(),
                input: weight.to_string(),
            })?;
            weights.insert(symbol.to_string(), weight);
        }
        if weights.is_empty() {
            return Err(TraderError::empty("weights"));
        }
        WeightMap::new(weights)
    }
}

/// Parse one weight: `"50%"`/`"50.00%"` is a percentage, `"0.5"` a fraction.
pub fn parse_weight(symbol: &str, input: &str) -> Result<Decimal, TraderError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TraderError::empty("weight"));
    }
    let invalid = || TraderError::InvalidWeight {
        symbol: symbol.to_string(),
        input: input.to_string(),
    };
    match trimmed.strip_suffix('%') {
        Some(percent) => Decimal::from_str(percent.trim())
            .map(|p| p / Decimal::ONE_HUNDRED)
            .map_err(|_| invalid()),
        None => Decimal::from_str(trimmed).map_err(|_| invalid()),
    }
}

impl fmt::Display for WeightMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (symbol, weight) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{} {:.2}%", symbol, weight * Decimal::ONE_HUNDRED)?;
        }
        Ok(())
    }
}
