use std::collections::HashMap;

use crate::domain::exchange::PriceMap;

/// Resolves asset prices in `quote` from a table of pair prices (`BTCUSDT` -> 48000.0).
#[derive(Debug, Clone)]
pub struct PriceResolver {
    quote: String,
    bridge: String,
    pairs: HashMap<String, f64>,
}

impl PriceResolver {
    pub fn new<Q, B, I>(quote: Q, bridge: B, pairs: I) -> Self
    where
        Q: Into<String>,
        B: Into<String>,
        I: IntoIterator<Item = (String, f64)>,
    {
        Self {
            quote: quote.into().to_uppercase(),
            bridge: bridge.into().to_uppercase(),
            pairs: pairs
                .into_iter()
                .filter(|(_, price)| price.is_finite() && *price > 0.0)
                .collect(),
        }
    }

    fn pair(&self, base: &str, quote: &str) -> Option<f64> {
        self.pairs.get(&format!("{base}{quote}")).copied()
    }

    /// The quote asset itself, the direct pair, the inverse pair, then the pair through the
    /// bridge asset.
    pub fn resolve(&self, symbol: &str) -> Option<f64> {
        let symbol = symbol.to_uppercase();
        if symbol == self.quote {
            return Some(1.0);
        }

        self.pair(&symbol, &self.quote)
            .or_else(|| self.pair(&self.quote, &symbol).map(|price| 1.0 / price))
            .or_else(|| {
                if symbol == self.bridge {
                    return None;
                }
                let in_bridge = self.pair(&symbol, &self.bridge)?;
                let bridge_price = self
                    .pair(&self.bridge, &self.quote)
                    .or_else(|| self.pair(&self.quote, &self.bridge).map(|p| 1.0 / p))?;
                Some(in_bridge * bridge_price)
            })
    }

    pub fn resolve_all(&self, symbols: &[String]) -> PriceMap {
        symbols
            .iter()
            .filter_map(|symbol| {
                let price = self.resolve(symbol);
                if price.is_none() {
                    tracing::trace!("Prices: 🔍 No market for {symbol}/{}", self.quote);
                }
                price.map(|price| (symbol.to_uppercase(), price))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PriceResolver {
        PriceResolver::new(
            "USDT",
            "BTC",
            [
                ("BTCUSDT", 50000.0),
                ("ETHUSDT", 2500.0),
                ("USDTBRL", 5.0),
                ("XMRBTC", 0.002),
                ("DEADUSDT", 0.0),
            ]
            .into_iter()
            .map(|(pair, price)| (pair.to_string(), price)),
        )
    }

    #[test]
    fn test_quote_asset_is_one() {
        assert_eq!(resolver().resolve("USDT"), Some(1.0));
    }

    #[test]
    fn test_direct_pair() {
        assert_eq!(resolver().resolve("eth"), Some(2500.0));
    }

    #[test]
    fn test_inverse_pair() {
        assert_eq!(resolver().resolve("BRL"), Some(0.2));
    }

    #[test]
    fn test_bridge_pair() {
        let price = resolver().resolve("XMR").unwrap();
        assert!((price - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_and_zero_priced_symbols() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("NOPE"), None);
        assert_eq!(resolver.resolve("DEAD"), None);

        let prices = resolver.resolve_all(&["BTC".to_string(), "NOPE".to_string()]);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get("BTC"), Some(&50000.0));
    }
}
