pub mod binance;
pub mod config;
pub mod sheets;
