use serde::{Deserialize, Deserializer};

/// Binance encodes most decimals as strings; a few endpoints send plain numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) if text.trim().is_empty() => Ok(0.0),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AccountInformation {
    pub balances: Vec<AccountBalance>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AccountBalance {
    pub asset: String,
    #[serde(deserialize_with = "string_or_number")]
    pub free: f64,
    #[serde(deserialize_with = "string_or_number")]
    pub locked: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SimpleEarnPage<T> {
    #[serde(default = "Vec::new")]
    pub rows: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FlexiblePositionRow {
    pub asset: String,
    #[serde(deserialize_with = "string_or_number")]
    pub total_amount: f64,
    #[serde(deserialize_with = "string_or_number", default)]
    pub latest_annual_percentage_rate: f64,
    #[serde(deserialize_with = "string_or_number", default)]
    pub cumulative_total_rewards: f64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LockedPositionRow {
    pub asset: String,
    #[serde(deserialize_with = "string_or_number")]
    pub amount: f64,
    #[serde(rename = "APY", deserialize_with = "string_or_number", default)]
    pub apy: f64,
    #[serde(deserialize_with = "string_or_number", default)]
    pub reward_amt: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TickerPrice {
    pub symbol: String,
    #[serde(deserialize_with = "string_or_number")]
    pub price: f64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    pub server_time: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiErrorBody {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_balances_from_strings() {
        let json = r#"{"makerCommission":15,"balances":[
            {"asset":"BTC","free":"0.50000000","locked":"0.00100000"},
            {"asset":"LTC","free":"0.00000000","locked":"0.00000000"}]}"#;
        let account: AccountInformation = serde_json::from_str(json).unwrap();
        assert_eq!(account.balances.len(), 2);
        assert_eq!(account.balances[0].free, 0.5);
        assert_eq!(account.balances[0].locked, 0.001);
    }

    #[test]
    fn test_flexible_row() {
        let json = r#"{"rows":[{"asset":"USDT","totalAmount":"75.46000000",
            "latestAnnualPercentageRate":"0.02599895","cumulativeTotalRewards":"0.45459183",
            "canRedeem":true}],"total":1}"#;
        let page: SimpleEarnPage<FlexiblePositionRow> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].total_amount, 75.46);
        assert_eq!(page.rows[0].latest_annual_percentage_rate, 0.02599895);
    }

    #[test]
    fn test_locked_row_with_missing_optional_fields() {
        let json = r#"{"rows":[{"asset":"AXS","amount":"122.09202928","APY":"0.2032"}],"total":1}"#;
        let page: SimpleEarnPage<LockedPositionRow> = serde_json::from_str(json).unwrap();
        assert_eq!(page.rows[0].amount, 122.09202928);
        assert_eq!(page.rows[0].apy, 0.2032);
        assert_eq!(page.rows[0].reward_amt, 0.0);
    }

    #[test]
    fn test_empty_page() {
        let page: SimpleEarnPage<LockedPositionRow> = serde_json::from_str("{}").unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_invalid_decimal_is_rejected() {
        let json = r#"{"symbol":"BTCUSDT","price":"abc"}"#;
        assert!(serde_json::from_str::<TickerPrice>(json).is_err());
    }

    #[test]
    fn test_numeric_price() {
        let json = r#"{"symbol":"BTCUSDT","price":48000.5}"#;
        let ticker: TickerPrice = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.price, 48000.5);
    }
}
