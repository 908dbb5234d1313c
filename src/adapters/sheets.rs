pub mod auth;
pub mod http_client;
pub mod portfolio_layout;
pub mod portfolio_sheet;
pub mod sheet_format;
pub mod spreadsheet_manager;
pub mod value_range_factory;

pub use portfolio_sheet::GoogleSheetsPortfolio;
pub use spreadsheet_manager::SpreadsheetManager;
