use std::collections::HashMap;

/// Current price of each symbol in the configured quote asset.
pub type PriceMap = HashMap<String, f64>;

/// Spot wallet balance of a single asset.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotBalance {
    pub symbol: String,
    pub free: f64,
    pub locked: f64,
}

impl SpotBalance {
    pub fn new<S: Into<String>>(symbol: S, free: f64, locked: f64) -> Self {
        Self {
            symbol: symbol.into(),
            free,
            locked,
        }
    }

    pub fn total(&self) -> f64 {
        self.free + self.locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum EarnProductType {
    Flexible,
    Locked,
}

/// An active Simple Earn subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct EarnPosition {
    pub symbol: String,
    pub principal: f64,
    pub product_type: EarnProductType,
    /// Annual rate in percent (5.0 means 5%).
    pub estimated_apr: f64,
    pub accrued_rewards: f64,
}
