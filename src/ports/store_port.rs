//! Persistence port for portfolios and strategies.

use crate::domain::error::TraderError;
use crate::domain::portfolio::Portfolio;
use crate::domain::strategy::Strategy;

pub trait StorePort {
    fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), TraderError>;

    fn load_portfolio(&self, name: &str) -> Result<Portfolio, TraderError>;

    /// Names of every stored portfolio, sorted.
    fn list_portfolios(&self) -> Result<Vec<String>, TraderError>;

    fn save_strategy(&self, strategy: &Strategy) -> Result<(), TraderError>;

    fn load_strategy(&self, name: &str) -> Result<Strategy, TraderError>;

    /// Names of every stored strategy, sorted.
    fn list_strategies(&self) -> Result<Vec<String>, TraderError>;
}
