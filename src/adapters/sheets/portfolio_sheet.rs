use error_stack::ResultExt;
use google_sheets4::api::ValueRange;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::{
    domain::{
        average_prices::AveragePrices, holding::PortfolioSnapshot,
        sheets::a1_notation::ToA1Notation,
    },
    ports::portfolio_sheet::{PortfolioSheet, SheetsError},
};

use super::{
    portfolio_layout::{self, build_sheet_values},
    sheet_format,
    spreadsheet_manager::{SpreadsheetManager, ValueRenderOption},
    value_range_factory::ValueRangeFactory,
};

/// The portfolio tab of a Google spreadsheet.
#[derive(Debug)]
pub struct GoogleSheetsPortfolio {
    manager: SpreadsheetManager,
    /// Rows the tab held at the last read or write, so a shorter report can blank the rest.
    occupied_rows: RwLock<usize>,
}

impl GoogleSheetsPortfolio {
    pub fn new(manager: SpreadsheetManager) -> Self {
        Self {
            manager,
            occupied_rows: RwLock::new(0),
        }
    }

    fn tab_name(&self) -> &str {
        &self.manager.config.tab_name
    }
}

#[async_trait::async_trait]
impl PortfolioSheet for GoogleSheetsPortfolio {
    #[instrument(skip(self), name = "GoogleSheetsPortfolio::read_average_prices")]
    async fn read_average_prices(&self) -> error_stack::Result<AveragePrices, SheetsError> {
        self.manager.ensure_tab(self.tab_name()).await?;

        let range = portfolio_layout::read_range().to_a1_notation(Some(self.tab_name()));
        tracing::trace!("Sheets: 📋 Reading {}", range);
        let rows = self
            .manager
            .read_range(&range, ValueRenderOption::Formula)
            .await?;

        let mut existing = portfolio_layout::parse_existing_rows(&rows);
        *self.occupied_rows.write().await = existing.occupied_rows;

        if existing.average_prices.has_formulas() {
            tracing::trace!("Sheets: 🧮 Resolving average price formulas");
            let computed = self
                .manager
                .read_range(&range, ValueRenderOption::Unformatted)
                .await?;
            portfolio_layout::resolve_formulas(&mut existing.average_prices, &computed);
        }

        if existing.average_prices.is_empty() {
            tracing::warn!(
                "Sheets: ⚠️ No average prices in '{}', PnL columns stay blank",
                self.tab_name()
            );
        }
        tracing::info!(
            "Sheets: ✅ {} average prices read from '{}'",
            existing.average_prices.len(),
            self.tab_name()
        );
        Ok(existing.average_prices)
    }

    #[instrument(skip_all, name = "GoogleSheetsPortfolio::write")]
    async fn write(
        &self,
        snapshot: &PortfolioSnapshot,
        previous_average_prices: &AveragePrices,
    ) -> error_stack::Result<(), SheetsError> {
        let sheet_id = self.manager.ensure_tab(self.tab_name()).await?;

        let previously_occupied = *self.occupied_rows.read().await;
        let values = build_sheet_values(snapshot, previous_average_prices, previously_occupied);
        let row_count = values.rows.len();
        let range = portfolio_layout::write_range(row_count).to_a1_notation(Some(self.tab_name()));

        tracing::trace!("Sheets: 📝 Writing {} rows to {}", row_count, range);
        self.manager
            .write_range(&range, ValueRange::from_rows(values.rows))
            .await
            .attach_printable_lazy(|| format!("{} holdings", snapshot.holdings.len()))?;

        *self.occupied_rows.write().await = values.content_rows;
        tracing::info!("Sheets: ✅ Wrote {} rows to '{}'", row_count, self.tab_name());

        // Best effort once the values are written.
        let requests = sheet_format::format_requests(sheet_id, snapshot, values.content_rows);
        if let Err(report) = self.manager.batch_update(requests).await {
            tracing::warn!("Sheets: ⚠️ Formatting '{}' failed: {:?}", self.tab_name(), report);
        }
        Ok(())
    }

    #[instrument(skip(self), name = "GoogleSheetsPortfolio::check_access")]
    async fn check_access(&self) -> error_stack::Result<(), SheetsError> {
        self.manager.ensure_tab(self.tab_name()).await.map(|_| ())
    }
}
