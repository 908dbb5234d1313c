use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::domain::{
    average_prices::AveragePrices,
    exchange::{EarnPosition, PriceMap, SpotBalance},
    holding::{Holding, PortfolioSnapshot, PortfolioTotal},
};

/// Prefix of the spot receipt tokens the exchange issues for flexible earn deposits.
const EARN_RECEIPT_PREFIX: &str = "LD";

#[derive(Debug, Default, Clone, PartialEq)]
struct Position {
    spot: f64,
    earn: f64,
    earn_apr: Option<f64>,
}

impl Position {
    fn quantity(&self) -> f64 {
        self.spot + self.earn
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Spot and earn quantities per symbol, with earn receipt tokens removed when the underlying
/// asset is already reported as an earn position.
fn merge_positions(
    balances: &[SpotBalance],
    earn_positions: &[EarnPosition],
) -> BTreeMap<String, Position> {
    let earn_symbols = earn_positions
        .iter()
        .map(|position| normalize(&position.symbol))
        .collect::<HashSet<_>>();

    let mut positions = BTreeMap::<String, Position>::new();

    for balance in balances {
        let symbol = normalize(&balance.symbol);
        let is_receipt = symbol
            .strip_prefix(EARN_RECEIPT_PREFIX)
            .is_some_and(|underlying| earn_symbols.contains(underlying));
        if is_receipt {
            tracing::trace!("Aggregator: 🔁 Skipping {symbol}, already counted as earn");
            continue;
        }
        positions.entry(symbol).or_default().spot += balance.total();
    }

    for earn in earn_positions {
        let position = positions.entry(normalize(&earn.symbol)).or_default();
        position.earn += earn.principal;
        position.earn_apr = match position.earn_apr {
            Some(apr) => Some(apr.max(earn.estimated_apr)),
            None => Some(earn.estimated_apr),
        };
    }

    positions.retain(|_, position| position.quantity() > 0.0);
    positions
}

/// Symbols that will need a price: every asset with a positive merged quantity.
pub fn held_symbols(balances: &[SpotBalance], earn_positions: &[EarnPosition]) -> Vec<String> {
    merge_positions(balances, earn_positions)
        .into_keys()
        .collect()
}

/// Builds the sorted portfolio rows and their total.
///
/// Held symbols without a usable price end up in [`PortfolioSnapshot::unpriced`], rows worth
/// less than `min_value_threshold` in [`PortfolioSnapshot::dust`]. Neither contributes to the
/// total.
#[instrument(skip_all, fields(balances = balances.len(), earn_positions = earn_positions.len()))]
pub fn aggregate(
    balances: &[SpotBalance],
    earn_positions: &[EarnPosition],
    prices: &PriceMap,
    previous_average_prices: &AveragePrices,
    min_value_threshold: f64,
    last_updated: DateTime<Utc>,
) -> PortfolioSnapshot {
    let mut holdings = Vec::new();
    let mut unpriced = Vec::new();
    let mut dust = Vec::new();

    for (symbol, position) in merge_positions(balances, earn_positions) {
        let current_price = match prices.get(&symbol) {
            Some(price) if price.is_finite() && *price > 0.0 => *price,
            _ => {
                unpriced.push(symbol);
                continue;
            }
        };

        let holding = Holding::new(
            symbol.as_str(),
            position.spot,
            position.earn,
            current_price,
            previous_average_prices.price(&symbol),
            last_updated,
        )
        .with_earn_apr(position.earn_apr);

        if holding.current_value < min_value_threshold {
            dust.push(symbol);
            continue;
        }

        holdings.push(holding);
    }

    holdings.sort_by(|a, b| {
        b.current_value
            .total_cmp(&a.current_value)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let total = PortfolioTotal::from_holdings(&holdings, last_updated);

    tracing::trace!(
        "Aggregator: 📊 {} holdings, {} unpriced, {} dust",
        holdings.len(),
        unpriced.len(),
        dust.len()
    );

    PortfolioSnapshot {
        holdings,
        total,
        unpriced,
        dust,
        generated_at: last_updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exchange::EarnProductType;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn earn(symbol: &str, principal: f64, apr: f64) -> EarnPosition {
        EarnPosition {
            symbol: symbol.to_string(),
            principal,
            product_type: EarnProductType::Flexible,
            estimated_apr: apr,
            accrued_rewards: 0.0,
        }
    }

    fn averages(entries: &[(&str, &str)]) -> AveragePrices {
        let mut averages = AveragePrices::new();
        for (symbol, raw) in entries {
            averages.insert(symbol, *raw);
        }
        averages
    }

    fn prices(entries: &[(&str, f64)]) -> PriceMap {
        entries
            .iter()
            .map(|(symbol, price)| (symbol.to_string(), *price))
            .collect()
    }

    #[test]
    fn test_single_btc_holding() {
        let averages = averages(&[("BTC", "45000")]);
        let snapshot = aggregate(
            &[SpotBalance::new("BTC", 0.5, 0.0)],
            &[],
            &prices(&[("BTC", 48000.0)]),
            &averages,
            0.0,
            now(),
        );

        assert_eq!(snapshot.holdings.len(), 1);
        let btc = &snapshot.holdings[0];
        assert_eq!(btc.current_value, 24000.0);
        assert_eq!(btc.invested_total, Some(22500.0));
        assert_eq!(btc.pnl_absolute, Some(1500.0));
        assert!((btc.pnl_percent.unwrap() - 6.666_666_666_666_667).abs() < 1e-9);
        assert_eq!(snapshot.total.current_value, 24000.0);
    }

    #[test]
    fn test_spot_and_earn_merge_into_one_row() {
        let snapshot = aggregate(
            &[SpotBalance::new("ETH", 0.3, 0.0)],
            &[earn("ETH", 0.2, 3.5)],
            &prices(&[("ETH", 100.0)]),
            &AveragePrices::new(),
            0.0,
            now(),
        );

        assert_eq!(snapshot.holdings.len(), 1);
        let eth = &snapshot.holdings[0];
        assert!((eth.quantity - 0.5).abs() < 1e-12);
        assert!((eth.current_value - 50.0).abs() < 1e-9);
        assert_eq!(eth.pnl_percent, None);
        assert_eq!(eth.pnl_absolute, None);
        assert_eq!(eth.earn_apr, Some(3.5));
        assert!(eth.has_spot() && eth.has_earn());
    }

    #[test]
    fn test_symbols_are_case_insensitive() {
        let snapshot = aggregate(
            &[SpotBalance::new("sol", 1.0, 0.0)],
            &[earn("SOL", 1.0, 2.0)],
            &prices(&[("SOL", 10.0)]),
            &AveragePrices::new(),
            0.0,
            now(),
        );
        assert_eq!(snapshot.holdings.len(), 1);
        assert_eq!(snapshot.holdings[0].symbol, "SOL");
        assert_eq!(snapshot.holdings[0].quantity, 2.0);
    }

    #[test]
    fn test_dust_is_dropped_and_not_totalled() {
        let snapshot = aggregate(
            &[
                SpotBalance::new("DOGE", 5.0, 0.0),
                SpotBalance::new("BTC", 1.0, 0.0),
            ],
            &[],
            &prices(&[("DOGE", 0.1), ("BTC", 100.0)]),
            &AveragePrices::new(),
            1.0,
            now(),
        );

        assert!(snapshot.holding("DOGE").is_none());
        assert_eq!(snapshot.dust, vec!["DOGE".to_string()]);
        assert_eq!(snapshot.total.current_value, 100.0);
    }

    #[test]
    fn test_missing_price_is_reported() {
        let snapshot = aggregate(
            &[
                SpotBalance::new("BTC", 1.0, 0.0),
                SpotBalance::new("XYZ", 10.0, 0.0),
                SpotBalance::new("ZERO", 10.0, 0.0),
            ],
            &[],
            &prices(&[("BTC", 100.0), ("ZERO", 0.0)]),
            &AveragePrices::new(),
            0.0,
            now(),
        );

        assert_eq!(snapshot.holdings.len(), 1);
        assert_eq!(
            snapshot.unpriced,
            vec!["XYZ".to_string(), "ZERO".to_string()]
        );
    }

    #[test]
    fn test_zero_quantity_is_excluded() {
        let snapshot = aggregate(
            &[SpotBalance::new("BTC", 0.0, 0.0)],
            &[earn("ETH", 0.0, 1.0)],
            &prices(&[("BTC", 100.0), ("ETH", 10.0)]),
            &AveragePrices::new(),
            0.0,
            now(),
        );
        assert!(snapshot.holdings.is_empty());
        assert!(snapshot.unpriced.is_empty());
        assert_eq!(snapshot.total.current_value, 0.0);
    }

    #[test]
    fn test_earn_receipt_tokens_are_not_double_counted() {
        let balances = [
            SpotBalance::new("LDBTC", 0.2, 0.0),
            SpotBalance::new("BTC", 0.1, 0.0),
            SpotBalance::new("LDO", 50.0, 0.0),
        ];
        let earn_positions = [earn("BTC", 0.2, 1.0)];

        assert_eq!(
            held_symbols(&balances, &earn_positions),
            vec!["BTC".to_string(), "LDO".to_string()]
        );

        let snapshot = aggregate(
            &balances,
            &earn_positions,
            &prices(&[("BTC", 100.0), ("LDO", 2.0), ("LDBTC", 100.0)]),
            &AveragePrices::new(),
            0.0,
            now(),
        );
        assert!((snapshot.holding("BTC").unwrap().quantity - 0.3).abs() < 1e-12);
        assert!(snapshot.holding("LDBTC").is_none());
        assert!(snapshot.holding("LDO").is_some());
    }

    #[test]
    fn test_sorted_by_value_then_symbol() {
        let snapshot = aggregate(
            &[
                SpotBalance::new("ETH", 1.0, 0.0),
                SpotBalance::new("ADA", 1.0, 0.0),
                SpotBalance::new("BTC", 1.0, 0.0),
            ],
            &[],
            &prices(&[("ETH", 50.0), ("ADA", 50.0), ("BTC", 500.0)]),
            &AveragePrices::new(),
            0.0,
            now(),
        );

        let order = snapshot
            .holdings
            .iter()
            .map(|h| h.symbol.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["BTC", "ADA", "ETH"]);
    }

    #[test]
    fn test_best_apr_is_kept() {
        let mut locked = earn("DOT", 5.0, 12.0);
        locked.product_type = EarnProductType::Locked;
        let snapshot = aggregate(
            &[],
            &[earn("DOT", 5.0, 4.0), locked],
            &prices(&[("DOT", 5.0)]),
            &AveragePrices::new(),
            0.0,
            now(),
        );
        let dot = snapshot.holding("DOT").unwrap();
        assert_eq!(dot.quantity, 10.0);
        assert_eq!(dot.earn_apr, Some(12.0));
        assert!(!dot.has_spot());
    }

    #[test]
    fn test_properties_hold_for_any_threshold() {
        let balances = [
            SpotBalance::new("BTC", 0.01, 0.0),
            SpotBalance::new("ETH", 0.5, 0.1),
            SpotBalance::new("DOGE", 12.0, 0.0),
            SpotBalance::new("USDT", 3.0, 0.0),
        ];
        let earn_positions = [earn("ETH", 0.4, 2.0), earn("USDT", 20.0, 8.0)];
        let prices = prices(&[
            ("BTC", 60000.0),
            ("ETH", 3000.0),
            ("DOGE", 0.12),
            ("USDT", 1.0),
        ]);
        let averages = averages(&[("BTC", "50000"), ("ETH", "-1")]);

        for threshold in [0.0, 1.0, 1.44, 23.0, 600.0, 10_000.0] {
            let snapshot = aggregate(
                &balances,
                &earn_positions,
                &prices,
                &averages,
                threshold,
                now(),
            );

            let symbols = snapshot
                .holdings
                .iter()
                .map(|h| h.symbol.clone())
                .collect::<HashSet<_>>();
            assert_eq!(symbols.len(), snapshot.holdings.len());

            for holding in &snapshot.holdings {
                assert!(holding.current_value >= threshold);
                assert_eq!(
                    holding.current_value,
                    holding.quantity * holding.current_price
                );
            }

            let eth_pnl = snapshot.holding("ETH").and_then(|h| h.pnl_percent);
            assert_eq!(eth_pnl, None);

            let sum = snapshot
                .holdings
                .iter()
                .map(|h| h.current_value)
                .sum::<f64>();
            assert_eq!(snapshot.total.current_value, sum);

            let again = aggregate(
                &balances,
                &earn_positions,
                &prices,
                &averages,
                threshold,
                now(),
            );
            assert_eq!(again.total, snapshot.total);
        }
    }
}
