pub mod aggregator;
pub mod health_check;
pub mod portfolio_routine;
