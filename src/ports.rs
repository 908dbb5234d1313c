pub mod exchange_client;
pub mod portfolio_sheet;
pub mod routine;
