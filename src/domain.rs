pub mod average_prices;
pub mod exchange;
pub mod holding;
pub mod sheets;

// Re-export commonly used types
pub use average_prices::AveragePrices;
pub use exchange::{EarnPosition, EarnProductType, PriceMap, SpotBalance};
pub use holding::{Holding, PortfolioSnapshot, PortfolioTotal};
