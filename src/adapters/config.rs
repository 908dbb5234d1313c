pub mod app_config;
pub mod binance_config;
pub mod logging_config;
pub mod portfolio_config;
pub mod sheets_config;

pub use app_config::{AppConfig, ConfigLoadError};
