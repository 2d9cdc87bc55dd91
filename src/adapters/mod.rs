//! Concrete adapter implementations for ports.

pub mod alpha_vantage_adapter;
pub mod csv_store_adapter;
pub mod file_config_adapter;
