//! Port traits: the seams between the ledger and the outside world.

pub mod config_port;
pub mod price_port;
pub mod quote_port;
pub mod store_port;
