use chrono::{DateTime, Utc};

pub const TOTAL_LABEL: &str = "TOTAL";

/// One row of the aggregated portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub spot_quantity: f64,
    pub earn_quantity: f64,
    /// Best APR among the earn positions of this symbol, in percent.
    pub earn_apr: Option<f64>,
    pub average_price: Option<f64>,
    pub current_price: f64,
    pub current_value: f64,
    pub invested_total: Option<f64>,
    pub pnl_percent: Option<f64>,
    pub pnl_absolute: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl Holding {
    /// Builds a row and derives value and PnL. PnL stays `None` unless the average price is
    /// strictly positive.
    pub fn new<S: Into<String>>(
        symbol: S,
        spot_quantity: f64,
        earn_quantity: f64,
        current_price: f64,
        average_price: Option<f64>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let quantity = spot_quantity + earn_quantity;
        let current_value = quantity * current_price;

        let invested_total = average_price
            .filter(|price| *price > 0.0)
            .map(|price| quantity * price)
            .filter(|invested| *invested > 0.0);
        let pnl_absolute = invested_total.map(|invested| current_value - invested);
        let pnl_percent = invested_total
            .zip(pnl_absolute)
            .map(|(invested, pnl)| pnl / invested * 100.0);

        Self {
            symbol: symbol.into(),
            quantity,
            spot_quantity,
            earn_quantity,
            earn_apr: None,
            average_price,
            current_price,
            current_value,
            invested_total,
            pnl_percent,
            pnl_absolute,
            last_updated,
        }
    }

    pub fn with_earn_apr(mut self, earn_apr: Option<f64>) -> Self {
        self.earn_apr = earn_apr;
        self
    }

    pub fn has_spot(&self) -> bool {
        self.spot_quantity > 0.0
    }

    pub fn has_earn(&self) -> bool {
        self.earn_quantity > 0.0
    }
}

/// The synthetic `TOTAL` row.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioTotal {
    pub current_value: f64,
    pub invested_total: f64,
    pub pnl_absolute: f64,
    pub pnl_percent: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl PortfolioTotal {
    /// Sums the rows; the percentage is recomputed from the sums. Rows without a cost basis only
    /// count towards `current_value`.
    pub fn from_holdings(holdings: &[Holding], last_updated: DateTime<Utc>) -> Self {
        let current_value = holdings.iter().map(|h| h.current_value).sum::<f64>();
        let invested_total = holdings.iter().filter_map(|h| h.invested_total).sum::<f64>();
        let pnl_absolute = holdings.iter().filter_map(|h| h.pnl_absolute).sum::<f64>();
        let pnl_percent = (invested_total > 0.0).then(|| pnl_absolute / invested_total * 100.0);

        Self {
            current_value,
            invested_total,
            pnl_absolute,
            pnl_percent,
            last_updated,
        }
    }
}

/// Everything one run produces: sorted holdings, their total, and the symbols that were left
/// out along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub holdings: Vec<Holding>,
    pub total: PortfolioTotal,
    /// Held symbols for which no market price was found.
    pub unpriced: Vec<String>,
    /// Symbols dropped because their value was under the threshold.
    pub dust: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn spot_count(&self) -> usize {
        self.holdings.iter().filter(|h| h.has_spot()).count()
    }

    pub fn earn_count(&self) -> usize {
        self.holdings.iter().filter(|h| h.has_earn()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_holding_with_average_price() {
        let holding = Holding::new("BTC", 0.5, 0.0, 48000.0, Some(45000.0), now());

        assert_eq!(holding.quantity, 0.5);
        assert_eq!(holding.current_value, 24000.0);
        assert_eq!(holding.invested_total, Some(22500.0));
        assert_eq!(holding.pnl_absolute, Some(1500.0));
        let pnl_percent = holding.pnl_percent.expect("pnl should be defined");
        assert!((pnl_percent - 6.666_666_666_666_667).abs() < 1e-9);
    }

    #[test]
    fn test_holding_without_average_price() {
        let holding = Holding::new("ETH", 1.0, 0.0, 2500.0, None, now());
        assert_eq!(holding.invested_total, None);
        assert_eq!(holding.pnl_percent, None);
        assert_eq!(holding.pnl_absolute, None);
    }

    #[test]
    fn test_non_positive_average_price_leaves_pnl_undefined() {
        for average in [0.0, -10.0] {
            let holding = Holding::new("ETH", 1.0, 0.0, 2500.0, Some(average), now());
            assert_eq!(holding.average_price, Some(average));
            assert_eq!(holding.invested_total, None, "average {average}");
            assert_eq!(holding.pnl_percent, None, "average {average}");
        }
    }

    #[test]
    fn test_total_recomputes_percentage_from_sums() {
        let holdings = vec![
            Holding::new("BTC", 1.0, 0.0, 110.0, Some(100.0), now()),
            Holding::new("ETH", 3.0, 0.0, 50.0, Some(100.0), now()),
            Holding::new("SOL", 1.0, 0.0, 40.0, None, now()),
        ];

        let total = PortfolioTotal::from_holdings(&holdings, now());

        assert_eq!(total.current_value, 300.0);
        assert_eq!(total.invested_total, 400.0);
        assert_eq!(total.pnl_absolute, -140.0);
        // -35%, not the per-row mean of -20%
        let pnl_percent = total.pnl_percent.expect("pnl should be defined");
        assert!((pnl_percent + 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_without_cost_basis() {
        let holdings = vec![Holding::new("SOL", 2.0, 0.0, 40.0, None, now())];
        let total = PortfolioTotal::from_holdings(&holdings, now());
        assert_eq!(total.current_value, 80.0);
        assert_eq!(total.invested_total, 0.0);
        assert_eq!(total.pnl_percent, None);
    }
}
