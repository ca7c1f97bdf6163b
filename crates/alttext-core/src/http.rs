//! Shared response handling for vendor HTTP APIs.

use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Turn a transport error into a `ProviderError`, tagging it with the vendor name.
///
/// Connect failures and socket timeouts become `Unreachable`; reqwest's
/// `Display` omits the cause, so the source chain is appended.
pub(crate) fn send_error(vendor: &str, e: reqwest::Error) -> ProviderError {
    let message = format!("{vendor} request failed: {}", error_chain(&e));
    if e.is_connect() || e.is_timeout() {
        ProviderError::Unreachable { message }
    } else {
        ProviderError::Http {
            message,
            status_code: e.status().map(|s| s.as_u16()),
        }
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Check the status code and parse a JSON body.
///
/// Non-success responses keep the status code so the retry layer can
/// classify them; the body text is included for diagnostics.
pub(crate) async fn read_json<T: DeserializeOwned>(
    vendor: &str,
    resp: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Http {
            message: format!("{vendor} HTTP {status}: {text}"),
            status_code: Some(status.as_u16()),
        });
    }

    resp.json().await.map_err(|e| ProviderError::Http {
        message: format!("Failed to parse {vendor} response: {e}"),
        status_code: None,
    })
}
