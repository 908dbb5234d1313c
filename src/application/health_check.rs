use std::{fmt, sync::Arc};

use tracing::instrument;

use crate::ports::{exchange_client::ExchangeClient, portfolio_sheet::PortfolioSheet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentStatus {
    pub name: String,
    pub error: Option<String>,
}

impl ComponentStatus {
    fn from_result<C: error_stack::Context>(
        name: &str,
        result: error_stack::Result<(), C>,
    ) -> Self {
        Self {
            name: name.to_string(),
            error: result
                .err()
                .map(|report| report.current_context().to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub components: Vec<ComponentStatus>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.components.iter().all(ComponentStatus::is_ok)
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, component) in self.components.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            match &component.error {
                None => write!(f, "✅ {}: OK", component.name)?,
                Some(error) => write!(f, "❌ {}: {}", component.name, error)?,
            }
        }
        Ok(())
    }
}

/// Checks both ends of the pipeline without writing anything.
pub struct HealthCheck {
    exchange: Arc<dyn ExchangeClient>,
    sheet: Arc<dyn PortfolioSheet>,
}

impl fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheck")
            .field("exchange", &self.exchange.exchange_name())
            .finish()
    }
}

impl HealthCheck {
    pub fn new(exchange: Arc<dyn ExchangeClient>, sheet: Arc<dyn PortfolioSheet>) -> Self {
        Self { exchange, sheet }
    }

    #[instrument(name = "HealthCheck::run")]
    pub async fn run(&self) -> HealthReport {
        let (exchange, sheet) = futures::join!(self.exchange.ping(), self.sheet.check_access());

        if let Err(report) = &exchange {
            tracing::error!("Health: ❌ {}: {:?}", self.exchange.exchange_name(), report);
        }
        if let Err(report) = &sheet {
            tracing::error!("Health: ❌ Google Sheets: {:?}", report);
        }

        HealthReport {
            components: vec![
                ComponentStatus::from_result(self.exchange.exchange_name(), exchange),
                ComponentStatus::from_result("Google Sheets", sheet),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = HealthReport {
            components: vec![
                ComponentStatus {
                    name: "Binance".to_string(),
                    error: None,
                },
                ComponentStatus {
                    name: "Google Sheets".to_string(),
                    error: Some("Spreadsheet or tab not found".to_string()),
                },
            ],
        };

        assert!(!report.is_healthy());
        assert_eq!(
            report.to_string(),
            "✅ Binance: OK\n❌ Google Sheets: Spreadsheet or tab not found"
        );
    }
}
