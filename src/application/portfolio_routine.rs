use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use error_stack::ResultExt;
use tracing::instrument;

use crate::{
    adapters::config::portfolio_config::PortfolioConfig,
    application::aggregator,
    domain::{average_prices::AveragePrices, holding::PortfolioSnapshot},
    ports::{
        exchange_client::ExchangeClient,
        portfolio_sheet::PortfolioSheet,
        routine::{Routine, RoutineError, Stage},
    },
};

const MAX_WRITE_ATTEMPTS: u32 = 2;

/// What one run produced, for the final log line.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub holdings: usize,
    pub spot_holdings: usize,
    pub earn_holdings: usize,
    pub total_value: f64,
    pub total_invested: f64,
    pub total_pnl: f64,
    pub pnl_percent: Option<f64>,
    pub unpriced: Vec<String>,
    pub dust: Vec<String>,
    pub write_attempts: u32,
}

impl RunSummary {
    fn new(snapshot: &PortfolioSnapshot, write_attempts: u32) -> Self {
        Self {
            holdings: snapshot.holdings.len(),
            spot_holdings: snapshot.spot_count(),
            earn_holdings: snapshot.earn_count(),
            total_value: snapshot.total.current_value,
            total_invested: snapshot.total.invested_total,
            total_pnl: snapshot.total.pnl_absolute,
            pnl_percent: snapshot.total.pnl_percent,
            unpriced: snapshot.unpriced.clone(),
            dust: snapshot.dust.clone(),
            write_attempts,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} holdings ({} spot, {} earn), value {:.2}, invested {:.2}, PnL {:.2}",
            self.holdings,
            self.spot_holdings,
            self.earn_holdings,
            self.total_value,
            self.total_invested,
            self.total_pnl
        )?;
        if let Some(pnl_percent) = self.pnl_percent {
            write!(f, " ({:.2}%)", pnl_percent)?;
        }
        Ok(())
    }
}

/// Fetches the account, aggregates it and writes it to the portfolio tab.
pub struct PortfolioRoutine {
    exchange: Arc<dyn ExchangeClient>,
    sheet: Arc<dyn PortfolioSheet>,
    settings: PortfolioConfig,
    force: bool,
}

impl fmt::Debug for PortfolioRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortfolioRoutine")
            .field("exchange", &self.exchange.exchange_name())
            .field("settings", &self.settings)
            .field("force", &self.force)
            .finish()
    }
}

impl PortfolioRoutine {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        sheet: Arc<dyn PortfolioSheet>,
        settings: PortfolioConfig,
    ) -> Self {
        Self {
            exchange,
            sheet,
            settings,
            force: false,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub async fn execute(&self) -> error_stack::Result<RunSummary, RoutineError> {
        self.execute_at(Utc::now()).await
    }

    #[instrument(skip(self), name = "PortfolioRoutine::execute")]
    pub async fn execute_at(
        &self,
        now: DateTime<Utc>,
    ) -> error_stack::Result<RunSummary, RoutineError> {
        let exchange = self.exchange.exchange_name();

        tracing::info!("{}: ☁️  Fetching spot balances", exchange);
        let balances = self
            .exchange
            .get_balances()
            .await
            .change_context(RoutineError::stage_failed(Stage::FetchBalances))?;

        tracing::info!("{}: ☁️  Fetching earn positions", exchange);
        let earn_positions = self
            .exchange
            .get_earn_positions()
            .await
            .change_context(RoutineError::stage_failed(Stage::FetchEarnPositions))?;

        let symbols = aggregator::held_symbols(&balances, &earn_positions);
        tracing::info!("Prices: ☁️  Fetching prices for {} symbols", symbols.len());
        let prices = self
            .exchange
            .get_prices(&symbols)
            .await
            .change_context(RoutineError::stage_failed(Stage::FetchPrices))?;

        tracing::info!("Sheets: 📋 Reading average prices");
        let average_prices = self
            .sheet
            .read_average_prices()
            .await
            .change_context(RoutineError::stage_failed(Stage::ReadAveragePrices))?;

        let snapshot = aggregator::aggregate(
            &balances,
            &earn_positions,
            &prices,
            &average_prices,
            self.settings.min_value_threshold,
            now,
        );
        tracing::info!(
            "Portfolio: 📊 {} holdings, total value {:.2} {}",
            snapshot.holdings.len(),
            snapshot.total.current_value,
            self.settings.quote_asset
        );
        for symbol in &snapshot.unpriced {
            tracing::warn!(
                "Prices: ⚠️ No {} price for {}, left out of the report",
                self.settings.quote_asset,
                symbol
            );
        }
        if !snapshot.dust.is_empty() {
            tracing::info!(
                "Portfolio: 🧹 {} holdings under {} {}: {}",
                snapshot.dust.len(),
                self.settings.min_value_threshold,
                self.settings.quote_asset,
                snapshot.dust.join(", ")
            );
        }

        let write_attempts = self.write_with_retry(&snapshot, &average_prices).await?;

        Ok(RunSummary::new(&snapshot, write_attempts))
    }

    async fn write_with_retry(
        &self,
        snapshot: &PortfolioSnapshot,
        average_prices: &AveragePrices,
    ) -> error_stack::Result<u32, RoutineError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            tracing::info!("Sheets: 📝 Writing portfolio (attempt {})", attempts);

            match self.sheet.write(snapshot, average_prices).await {
                Ok(()) => return Ok(attempts),
                Err(report)
                    if attempts < MAX_WRITE_ATTEMPTS && report.current_context().is_transient() =>
                {
                    tracing::warn!("Sheets: 🔁 Write failed, retrying once: {:?}", report);
                }
                Err(report) => {
                    return Err(report
                        .change_context(RoutineError::stage_failed(Stage::WriteSheet))
                        .attach_printable(format!("Write attempts: {attempts}")));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Routine for PortfolioRoutine {
    fn name(&self) -> &str {
        "Portfolio"
    }

    #[instrument(skip(self), name = "PortfolioRoutine::run")]
    async fn run(&self) -> error_stack::Result<(), RoutineError> {
        if self.force {
            tracing::info!("{}: --force has no effect, running normally", self.name());
        }

        let summary = self.execute().await?;

        tracing::info!("{}: ✅ {}", self.name(), summary);
        if !summary.unpriced.is_empty() {
            tracing::warn!(
                "{}: ⚠️ Unpriced symbols: {}",
                self.name(),
                summary.unpriced.join(", ")
            );
        }
        Ok(())
    }
}
