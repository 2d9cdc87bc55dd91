//! Core domain types and logic.

pub mod money;
pub mod calendar;
pub mod lot;
pub mod portfolio;
pub mod weights;
pub mod strategy;
pub mod account;
pub mod oracle;
pub mod trader;
pub mod config_validation;
pub mod error;
