use error_stack::Report;
use google_sheets4::{hyper, hyper_rustls};

use crate::ports::portfolio_sheet::SheetsError;

pub type HttpsConnector = hyper_rustls::HttpsConnector<hyper::client::HttpConnector>;

fn native_roots_unavailable(error: std::io::Error) -> Report<SheetsError> {
    Report::new(error)
        .change_context(SheetsError::InvalidData)
        .attach_printable("Could not load the platform's root certificates")
}

pub fn http_client() -> error_stack::Result<hyper::Client<HttpsConnector>, SheetsError> {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(native_roots_unavailable)?
        .https_or_http()
        .enable_http1()
        .build();

    Ok(hyper::Client::builder().build(connector))
}
