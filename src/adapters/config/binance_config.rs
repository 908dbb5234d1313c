use std::fmt;

fn default_base_url() -> Box<str> {
    "https://api.binance.com".into()
}

fn default_recv_window() -> u64 {
    5000
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(serde::Deserialize, Clone)]
pub struct BinanceConfig {
    pub api_key: Box<str>,
    pub secret_key: Box<str>,
    #[serde(default = "default_base_url")]
    pub base_url: Box<str>,
    #[serde(default = "default_recv_window")]
    pub recv_window: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("recv_window", &self.recv_window)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
