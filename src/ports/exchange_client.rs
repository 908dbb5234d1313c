use thiserror::Error;

use crate::domain::exchange::{EarnPosition, PriceMap, SpotBalance};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Exchange rejected the credentials")]
    Authentication,
    #[error("Exchange rate limit reached")]
    RateLimit,
    #[error("Exchange could not be reached")]
    Network,
    #[error("Exchange returned an unexpected response")]
    InvalidResponse,
}

/// Read-only view of an exchange account.
#[async_trait::async_trait]
pub trait ExchangeClient: Send + Sync {
    fn exchange_name(&self) -> &str;

    /// Every asset with a nonzero spot balance.
    async fn get_balances(&self) -> error_stack::Result<Vec<SpotBalance>, ExchangeError>;

    /// Active flexible and locked earn positions.
    async fn get_earn_positions(&self) -> error_stack::Result<Vec<EarnPosition>, ExchangeError>;

    /// Prices in the quote asset. Symbols without a market are left out of the map.
    async fn get_prices(&self, symbols: &[String])
        -> error_stack::Result<PriceMap, ExchangeError>;

    async fn ping(&self) -> error_stack::Result<(), ExchangeError>;
}
