fn default_quote_asset() -> Box<str> {
    "USDT".into()
}

fn default_bridge_asset() -> Box<str> {
    "BTC".into()
}

fn default_min_value_threshold() -> f64 {
    1.0
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    #[serde(default = "default_quote_asset")]
    pub quote_asset: Box<str>,
    /// Holdings worth less than this, in the quote asset, are left out.
    #[serde(default = "default_min_value_threshold")]
    pub min_value_threshold: f64,
    #[serde(default = "default_bridge_asset")]
    pub bridge_asset: Box<str>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            quote_asset: default_quote_asset(),
            min_value_threshold: default_min_value_threshold(),
            bridge_asset: default_bridge_asset(),
        }
    }
}
