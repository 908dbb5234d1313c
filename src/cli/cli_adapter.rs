use std::sync::Arc;

use error_stack::{report, Report, ResultExt};
use thiserror::Error;
use tracing::{instrument, Instrument};

use crate::{
    adapters::{
        binance::BinanceClient,
        config::{portfolio_config::PortfolioConfig, AppConfig, ConfigLoadError},
        sheets::{GoogleSheetsPortfolio, SpreadsheetManager},
    },
    application::{health_check::HealthCheck, portfolio_routine::PortfolioRoutine},
    ports::{
        exchange_client::{ExchangeClient, ExchangeError},
        portfolio_sheet::{PortfolioSheet, SheetsError},
        routine::Routine,
    },
};

pub const USAGE: &str = "Usage: crypto-portfolio [run] [--force] | crypto-portfolio health";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run { force: bool },
    HealthCheck,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid command: {details}")]
    InvalidCommand { details: String },
    #[error("Failed to set up {component}")]
    SetupFailed { component: &'static str },
    #[error("Command failed")]
    ExecutionFailed,
}

impl CommandError {
    fn invalid<S: Into<String>>(details: S) -> Self {
        CommandError::InvalidCommand {
            details: details.into(),
        }
    }
}

/// `args` includes the program name, as returned by [`std::env::args`].
pub fn parse_args(args: &[String]) -> Result<Command, CommandError> {
    let mut command = None;
    let mut force = false;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--force" => force = true,
            flag if flag.starts_with('-') => {
                return Err(CommandError::invalid(format!("unknown flag '{flag}'")))
            }
            name if command.is_none() => command = Some(name.to_string()),
            extra => {
                return Err(CommandError::invalid(format!("unexpected argument '{extra}'")))
            }
        }
    }

    match command.as_deref() {
        None | Some("run") => Ok(Command::Run { force }),
        Some("health") if force => Err(CommandError::invalid("--force only applies to run")),
        Some("health") => Ok(Command::HealthCheck),
        Some(other) => Err(CommandError::invalid(format!("unknown command '{other}'"))),
    }
}

/// Process exit status for a failed run, from the most specific error kind in the report.
pub fn exit_code<C>(report: &Report<C>) -> u8 {
    if report.downcast_ref::<ConfigLoadError>().is_some() {
        return 2;
    }
    if let Some(CommandError::InvalidCommand { .. }) = report.downcast_ref::<CommandError>() {
        return 2;
    }

    match (
        report.downcast_ref::<ExchangeError>(),
        report.downcast_ref::<SheetsError>(),
    ) {
        (Some(ExchangeError::Authentication), _) | (_, Some(SheetsError::Auth)) => 3,
        (Some(ExchangeError::RateLimit | ExchangeError::Network), _)
        | (_, Some(SheetsError::TransientWrite)) => 4,
        (_, Some(SheetsError::NotFound)) => 5,
        _ => 1,
    }
}

pub struct CliAdapter {
    exchange: Arc<dyn ExchangeClient>,
    sheet: Arc<dyn PortfolioSheet>,
    settings: PortfolioConfig,
}

impl std::fmt::Debug for CliAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliAdapter")
            .field("exchange", &self.exchange.exchange_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl CliAdapter {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        sheet: Arc<dyn PortfolioSheet>,
        settings: PortfolioConfig,
    ) -> Self {
        Self {
            exchange,
            sheet,
            settings,
        }
    }

    /// Wires the Binance client and the Google Sheets tab described by `config`.
    #[instrument(skip_all, name = "CliAdapter::from_config")]
    pub async fn from_config(config: &AppConfig) -> error_stack::Result<Self, CommandError> {
        let exchange = BinanceClient::new(config.binance.clone(), &config.portfolio)
            .change_context(CommandError::SetupFailed {
                component: "Binance client",
            })?;

        let manager = SpreadsheetManager::new(config.sheets.clone())
            .await
            .change_context(CommandError::SetupFailed {
                component: "Google Sheets client",
            })?;

        Ok(Self::new(
            Arc::new(exchange),
            Arc::new(GoogleSheetsPortfolio::new(manager)),
            config.portfolio.clone(),
        ))
    }

    #[instrument]
    pub async fn handle(&self, command: Command) -> error_stack::Result<String, CommandError> {
        match command {
            Command::Run { force } => {
                let routine = PortfolioRoutine::new(
                    Arc::clone(&self.exchange),
                    Arc::clone(&self.sheet),
                    self.settings.clone(),
                )
                .with_force(force);

                routine
                    .run()
                    .instrument(tracing::span!(
                        tracing::Level::INFO,
                        "routine",
                        routine = routine.name()
                    ))
                    .await
                    .change_context(CommandError::ExecutionFailed)?;

                Ok(format!("✅ {}: OK", routine.name()))
            }
            Command::HealthCheck => {
                let health = HealthCheck::new(Arc::clone(&self.exchange), Arc::clone(&self.sheet))
                    .run()
                    .await;

                if health.is_healthy() {
                    Ok(health.to_string())
                } else {
                    Err(report!(CommandError::ExecutionFailed).attach_printable(health.to_string()))
                }
            }
        }
    }
}
