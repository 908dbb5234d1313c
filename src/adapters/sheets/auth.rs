use error_stack::{report, ResultExt};
use google_sheets4::hyper;
use google_sheets4::oauth2::{self, authenticator::Authenticator};

use crate::{
    adapters::config::sheets_config::{ServiceAccountKey, SpreadsheetConfig},
    ports::portfolio_sheet::SheetsError,
};

use super::http_client::HttpsConnector;

pub async fn auth(
    config: &SpreadsheetConfig,
    client: hyper::Client<HttpsConnector>,
) -> error_stack::Result<Authenticator<HttpsConnector>, SheetsError> {
    let secret: oauth2::ServiceAccountKey = match config.service_account_key() {
        Some(ServiceAccountKey::Json(json)) => oauth2::parse_service_account_key(json)
            .change_context(SheetsError::Auth)
            .attach_printable("Inline service account key is not valid JSON")?,
        Some(ServiceAccountKey::Path(path)) => oauth2::read_service_account_key(path)
            .await
            .change_context(SheetsError::Auth)
            .attach_printable_lazy(|| {
                format!("Could not read service account private key at '{path}'")
            })?,
        None => {
            return Err(report!(SheetsError::Auth)
                .attach_printable("No service account key configured"));
        }
    };

    oauth2::ServiceAccountAuthenticator::with_client(secret, client)
        .build()
        .await
        .change_context(SheetsError::Auth)
        .attach_printable("Could not create an authenticator")
}
