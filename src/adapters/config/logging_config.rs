fn default_file() -> Box<str> {
    "crypto_portfolio.log".into()
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_file")]
    pub file: Box<str>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_file(),
        }
    }
}
