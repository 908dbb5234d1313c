pub mod client;
pub mod models;
pub mod price_resolver;
pub mod signing;

pub use client::BinanceClient;
