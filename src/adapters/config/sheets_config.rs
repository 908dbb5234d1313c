use std::fmt;

fn default_tab_name() -> Box<str> {
    "Portfolio".into()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Where the service-account key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum ServiceAccountKey<'a> {
    Path(&'a str),
    Json(&'a str),
}

#[derive(serde::Deserialize, Clone)]
pub struct SpreadsheetConfig {
    pub spreadsheet_id: Box<str>,
    #[serde(default = "default_tab_name")]
    pub tab_name: Box<str>,
    /// Path to the service-account key file.
    #[serde(default)]
    pub priv_key: Option<Box<str>>,
    /// The service-account key itself, as JSON. Takes precedence over `priv_key`.
    #[serde(default)]
    pub priv_key_json: Option<Box<str>>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SpreadsheetConfig {
    pub fn service_account_key(&self) -> Option<ServiceAccountKey<'_>> {
        fn non_blank(value: &Option<Box<str>>) -> Option<&str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
        }

        non_blank(&self.priv_key_json)
            .map(ServiceAccountKey::Json)
            .or_else(|| non_blank(&self.priv_key).map(ServiceAccountKey::Path))
    }
}

impl fmt::Debug for SpreadsheetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpreadsheetConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("tab_name", &self.tab_name)
            .field("priv_key", &self.priv_key)
            .field(
                "priv_key_json",
                &self.priv_key_json.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
