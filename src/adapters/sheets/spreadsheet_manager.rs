use std::{fmt::Debug, future::Future, time::Duration};

use error_stack::{report, ResultExt};
use google_sheets4::{
    api::{BatchUpdateSpreadsheetRequest, Request, ValueRange},
    Sheets,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::{
    adapters::config::sheets_config::SpreadsheetConfig,
    domain::sheets::a1_notation::A1Notation, ports::portfolio_sheet::SheetsError,
};

use super::{
    auth,
    http_client::{self, HttpsConnector},
    value_range_factory::cell_text,
};

/// Maps a failed Sheets API response to an error kind.
pub fn classify_status(code: Option<u16>, message: &str) -> SheetsError {
    match code {
        Some(401 | 403) => SheetsError::Auth,
        Some(404) => SheetsError::NotFound,
        Some(400) if message.contains("Unable to parse range") => SheetsError::NotFound,
        Some(408 | 429 | 500..=599) => SheetsError::TransientWrite,
        _ => SheetsError::InvalidData,
    }
}

pub fn classify_api_error(error: &google_sheets4::Error) -> SheetsError {
    match error {
        google_sheets4::Error::BadRequest(body) => {
            let code = body
                .pointer("/error/code")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok());
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            classify_status(code, message)
        }
        google_sheets4::Error::Failure(response) => {
            classify_status(Some(response.status().as_u16()), "")
        }
        google_sheets4::Error::MissingToken(_) | google_sheets4::Error::MissingAPIKey => {
            SheetsError::Auth
        }
        google_sheets4::Error::HttpError(_)
        | google_sheets4::Error::Io(_)
        | google_sheets4::Error::Cancelled => SheetsError::TransientWrite,
        _ => SheetsError::InvalidData,
    }
}

/// How a values read renders each cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ValueRenderOption {
    /// Formulas as typed, everything else as its value.
    #[strum(serialize = "FORMULA")]
    Formula,
    #[strum(serialize = "UNFORMATTED_VALUE")]
    Unformatted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTab {
    pub title: String,
    pub sheet_id: i32,
}

pub struct SpreadsheetManager {
    pub config: SpreadsheetConfig,
    hub: Sheets<HttpsConnector>,
    timeout: Duration,
    tabs_cache: RwLock<Option<Vec<SheetTab>>>,
}

impl Debug for SpreadsheetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SpreadsheetManager {{ config: {:?} }}", self.config)
    }
}

impl SpreadsheetManager {
    #[instrument(name = "SpreadsheetManager::new")]
    pub async fn new(config: SpreadsheetConfig) -> error_stack::Result<Self, SheetsError> {
        let client = http_client::http_client()?;
        let auth = auth::auth(&config, client.clone()).await?;
        let hub = Sheets::new(client, auth);

        Ok(SpreadsheetManager {
            timeout: Duration::from_secs(config.timeout_secs),
            config,
            hub,
            tabs_cache: RwLock::new(None),
        })
    }

    async fn call<T, F>(&self, request: F, what: &str) -> error_stack::Result<T, SheetsError>
    where
        F: Future<Output = google_sheets4::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(report!(classify_api_error(&error))
                .attach_printable(format!("{what} failed: {error}"))),
            Err(_) => Err(report!(SheetsError::TransientWrite)
                .attach_printable(format!("{what} timed out after {:?}", self.timeout))),
        }
    }

    #[instrument]
    async fn fetch_tabs(&self) -> error_stack::Result<Vec<SheetTab>, SheetsError> {
        let (_, spreadsheet) = self
            .call(
                self.hub
                    .spreadsheets()
                    .get(&self.config.spreadsheet_id)
                    .doit(),
                "Fetching spreadsheet",
            )
            .await?;

        let tabs = spreadsheet
            .sheets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|sheet| {
                let properties = sheet.properties?;
                Some(SheetTab {
                    title: properties.title?,
                    sheet_id: properties.sheet_id.unwrap_or_default(),
                })
            })
            .collect();

        Ok(tabs)
    }

    #[instrument]
    pub async fn tabs(&self) -> error_stack::Result<Vec<SheetTab>, SheetsError> {
        let cache = {
            // -- MUTEX READ --
            let guard = self.tabs_cache.read().await;
            guard.clone()
            // -- END MUTEX READ --
        };

        match cache {
            Some(tabs) => Ok(tabs),
            None => {
                let tabs = self.fetch_tabs().await?;
                {
                    // -- MUTEX WRITE --
                    let mut guard = self.tabs_cache.write().await;
                    guard.replace(tabs.clone());
                    // -- END MUTEX WRITE --
                }
                Ok(tabs)
            }
        }
    }

    /// Id of the tab named `title`, which must already exist.
    #[instrument]
    pub async fn ensure_tab(&self, title: &str) -> error_stack::Result<i32, SheetsError> {
        let tabs = self.tabs().await?;
        if let Some(tab) = tabs.iter().find(|tab| tab.title == title) {
            return Ok(tab.sheet_id);
        }

        Err(report!(SheetsError::NotFound))
            .attach_printable_lazy(|| {
                format!(
                    "Tab '{title}' not found in spreadsheet {}",
                    self.config.spreadsheet_id
                )
            })
            .attach_printable_lazy(|| {
                let titles = tabs.iter().map(|tab| tab.title.as_str()).collect::<Vec<_>>();
                format!("Available tabs: {}", titles.join(", "))
            })
    }

    /// Cell texts of `range`, row by row. Trailing empty rows and cells are not returned.
    #[instrument]
    pub async fn read_range(
        &self,
        range: &A1Notation,
        render: ValueRenderOption,
    ) -> error_stack::Result<Vec<Vec<String>>, SheetsError> {
        let (_, value_range) = self
            .call(
                self.hub
                    .spreadsheets()
                    .values_get(&self.config.spreadsheet_id, range.as_ref())
                    .value_render_option(&render.to_string())
                    .doit(),
                "Reading range",
            )
            .await
            .attach_printable_lazy(|| format!("Range: {range}"))?;

        let rows = value_range
            .values
            .unwrap_or_default()
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        Ok(rows)
    }

    #[instrument(skip(value_range))]
    pub async fn write_range(
        &self,
        range: &A1Notation,
        value_range: ValueRange,
    ) -> error_stack::Result<(), SheetsError> {
        self.call(
            self.hub
                .spreadsheets()
                .values_update(value_range, &self.config.spreadsheet_id, range.as_ref())
                .value_input_option("USER_ENTERED")
                .doit(),
            "Writing range",
        )
        .await
        .map(|_| ())
        .attach_printable_lazy(|| format!("Failed to write to range {}", range))
    }

    #[instrument(skip(requests), fields(requests = requests.len()))]
    pub async fn batch_update(&self, requests: Vec<Request>) -> error_stack::Result<(), SheetsError> {
        let request = BatchUpdateSpreadsheetRequest {
            requests: Some(requests),
            ..Default::default()
        };

        self.call(
            self.hub
                .spreadsheets()
                .batch_update(request, &self.config.spreadsheet_id)
                .doit(),
            "Updating spreadsheet",
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_render_option() {
        assert_eq!(ValueRenderOption::Formula.to_string(), "FORMULA");
        assert_eq!(ValueRenderOption::Unformatted.to_string(), "UNFORMATTED_VALUE");
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(Some(401), ""), SheetsError::Auth);
        assert_eq!(classify_status(Some(403), ""), SheetsError::Auth);
        assert_eq!(classify_status(Some(404), ""), SheetsError::NotFound);
        assert_eq!(
            classify_status(Some(400), "Unable to parse range: 'Missing'!A1:I"),
            SheetsError::NotFound
        );
        assert_eq!(classify_status(Some(400), "Invalid value"), SheetsError::InvalidData);
        assert_eq!(classify_status(Some(429), ""), SheetsError::TransientWrite);
        assert_eq!(classify_status(Some(503), ""), SheetsError::TransientWrite);
        assert_eq!(classify_status(None, ""), SheetsError::InvalidData);
    }

    #[test]
    fn test_classify_bad_request_body() {
        let error = google_sheets4::Error::BadRequest(json!({
            "error": {
                "code": 403,
                "message": "The caller does not have permission",
                "status": "PERMISSION_DENIED"
            }
        }));
        assert_eq!(classify_api_error(&error), SheetsError::Auth);

        let error = google_sheets4::Error::BadRequest(json!({
            "error": {"code": 400, "message": "Unable to parse range: Portfolio!A1:I"}
        }));
        assert_eq!(classify_api_error(&error), SheetsError::NotFound);
    }

    #[test]
    fn test_classify_transport_errors() {
        assert_eq!(
            classify_api_error(&google_sheets4::Error::Cancelled),
            SheetsError::TransientWrite
        );
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(
            classify_api_error(&google_sheets4::Error::Io(io)),
            SheetsError::TransientWrite
        );
    }
}
