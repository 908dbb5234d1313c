use config::{builder::DefaultState, Config, ConfigBuilder, Environment};
use error_stack::{report, ResultExt};
use serde::Deserialize;
use serde_path_to_error::{Deserializer as PathDeserializer, Segment, Track};
use thiserror::Error;

use super::{
    binance_config::BinanceConfig, logging_config::LoggingConfig,
    portfolio_config::PortfolioConfig, sheets_config::SpreadsheetConfig,
};

const ENV_PREFIX: &str = "CRYPTO_PORTFOLIO";

/// Plain environment variables accepted on top of the prefixed ones, with the key they set.
const LEGACY_ENV: [(&str, &str); 5] = [
    ("BINANCE_API_KEY", "binance.api_key"),
    ("BINANCE_SECRET_KEY", "binance.secret_key"),
    ("GOOGLE_SHEET_ID", "sheets.spreadsheet_id"),
    ("GOOGLE_SHEETS_CREDENTIALS", "sheets.priv_key_json"),
    ("GOOGLE_SHEETS_CREDENTIALS_FILE", "sheets.priv_key"),
];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLoadError {
    #[error("Failed to read configuration sources")]
    Read,
    #[error("Invalid configuration")]
    Invalid,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub binance: BinanceConfig,
    pub sheets: SpreadsheetConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn field_path(track: Track) -> String {
    track
        .path()
        .iter()
        .map(|seg| match seg {
            Segment::Seq { index } => format!("[{}]", index),
            Segment::Map { key } => format!(".{}", key),
            Segment::Enum { variant } => format!("::{}", variant),
            Segment::Unknown => String::from("<?>"),
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

impl AppConfig {
    /// Reads `.env`, the `Config` file (or `CONFIG_PATH`) and the environment.
    pub fn load() -> error_stack::Result<Self, ConfigLoadError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(report!(ConfigLoadError::Read).attach_printable(err.to_string()));
            }
        }

        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "Config".to_string());

        let builder = Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config = Self::with_legacy_env(builder)?
            .build()
            .change_context(ConfigLoadError::Read)
            .attach_printable_lazy(|| format!("Config file: {config_path}"))?;

        Self::from_config(config).attach_printable_lazy(|| format!("Config file: {config_path}"))
    }

    fn with_legacy_env(
        builder: ConfigBuilder<DefaultState>,
    ) -> error_stack::Result<ConfigBuilder<DefaultState>, ConfigLoadError> {
        LEGACY_ENV
            .iter()
            .try_fold(builder, |builder, (var, key)| {
                let value = std::env::var(var).ok().filter(|value| !value.is_empty());
                builder.set_override_option(*key, value)
            })
            .change_context(ConfigLoadError::Read)
    }

    pub fn from_config(config: Config) -> error_stack::Result<Self, ConfigLoadError> {
        let mut track = Track::new();
        let path_de = PathDeserializer::new(config, &mut track);
        let app_config = AppConfig::deserialize(path_de).map_err(|err| {
            report!(ConfigLoadError::Invalid)
                .attach_printable(err.to_string())
                .attach_printable(format!("Field path: {}", field_path(track)))
        })?;

        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> error_stack::Result<(), ConfigLoadError> {
        let blank = |field: &str, value: &str| {
            value.trim().is_empty().then(|| {
                report!(ConfigLoadError::Invalid)
                    .attach_printable(format!("Field path: {field}"))
                    .attach_printable("Value must not be empty")
            })
        };

        if let Some(report) = blank("binance.api_key", &*self.binance.api_key)
            .or_else(|| blank("binance.secret_key", &*self.binance.secret_key))
            .or_else(|| blank("sheets.spreadsheet_id", &*self.sheets.spreadsheet_id))
            .or_else(|| blank("sheets.tab_name", &*self.sheets.tab_name))
        {
            return Err(report);
        }

        if self.sheets.service_account_key().is_none() {
            return Err(report!(ConfigLoadError::Invalid)
                .attach_printable("Field path: sheets.priv_key")
                .attach_printable("Either sheets.priv_key or sheets.priv_key_json must be set"));
        }

        if !self.portfolio.min_value_threshold.is_finite()
            || self.portfolio.min_value_threshold < 0.0
        {
            return Err(report!(ConfigLoadError::Invalid)
                .attach_printable("Field path: portfolio.min_value_threshold")
                .attach_printable("Threshold must be a non-negative number"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn parse(toml: &str) -> error_stack::Result<AppConfig, ConfigLoadError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();
        AppConfig::from_config(config)
    }

    const MINIMAL: &str = r#"
        [binance]
        api_key = "key"
        secret_key = "secret"

        [sheets]
        spreadsheet_id = "sheet-id"
        priv_key = "service_account.json"
    "#;

    #[test]
    fn test_defaults() {
        let config = parse(MINIMAL).unwrap();

        assert_eq!(&*config.binance.base_url, "https://api.binance.com");
        assert_eq!(config.binance.recv_window, 5000);
        assert_eq!(config.binance.timeout_secs, 10);
        assert_eq!(&*config.sheets.tab_name, "Portfolio");
        assert_eq!(config.portfolio, PortfolioConfig::default());
        assert_eq!(&*config.logging.file, "crypto_portfolio.log");
    }

    #[test]
    fn test_overrides() {
        let toml = format!(
            "{MINIMAL}\n[portfolio]\nquote_asset = \"EUR\"\nmin_value_threshold = 5.5\n"
        );
        let config = parse(&toml).unwrap();
        assert_eq!(&*config.portfolio.quote_asset, "EUR");
        assert_eq!(config.portfolio.min_value_threshold, 5.5);
        assert_eq!(&*config.portfolio.bridge_asset, "BTC");
    }

    #[test]
    fn test_missing_field_reports_path() {
        let report = parse(
            r#"
            [binance]
            api_key = "key"

            [sheets]
            spreadsheet_id = "sheet-id"
            priv_key = "service_account.json"
        "#,
        )
        .unwrap_err();

        assert_eq!(*report.current_context(), ConfigLoadError::Invalid);
        let rendered = format!("{report:?}");
        assert!(rendered.contains("secret_key"), "{rendered}");
        assert!(rendered.contains("Field path: binance"), "{rendered}");
    }

    #[test]
    fn test_service_account_key_is_required() {
        let report = parse(
            r#"
            [binance]
            api_key = "key"
            secret_key = "secret"

            [sheets]
            spreadsheet_id = "sheet-id"
        "#,
        )
        .unwrap_err();
        assert!(format!("{report:?}").contains("sheets.priv_key"));
    }

    #[test]
    fn test_negative_threshold_is_rejected() {
        let toml = format!("{MINIMAL}\n[portfolio]\nmin_value_threshold = -1.0\n");
        assert!(parse(&toml).is_err());
    }

    #[test]
    fn test_debug_never_prints_secrets() {
        let config = parse(MINIMAL).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("\"secret\""), "{debug}");
        assert!(!debug.contains("\"key\""), "{debug}");
    }
}
