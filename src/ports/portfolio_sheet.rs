use thiserror::Error;

use crate::domain::{average_prices::AveragePrices, holding::PortfolioSnapshot};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetsError {
    #[error("Spreadsheet service rejected the credentials")]
    Auth,
    #[error("Spreadsheet or tab not found")]
    NotFound,
    #[error("Spreadsheet write failed temporarily")]
    TransientWrite,
    #[error("Spreadsheet request failed")]
    InvalidData,
}

impl SheetsError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SheetsError::TransientWrite)
    }
}

/// The tab the portfolio is written to. Column C (Average Price) belongs to the user.
#[async_trait::async_trait]
pub trait PortfolioSheet: Send + Sync {
    async fn read_average_prices(&self) -> error_stack::Result<AveragePrices, SheetsError>;

    /// Overwrites the data range in one request, writing `previous_average_prices` back as-is.
    async fn write(
        &self,
        snapshot: &PortfolioSnapshot,
        previous_average_prices: &AveragePrices,
    ) -> error_stack::Result<(), SheetsError>;

    async fn check_access(&self) -> error_stack::Result<(), SheetsError>;
}
