//! Response handling for the OMDb API
//!
//! OMDb answers HTTP 200 for most failures and reports them in the body as
//! `{"Response":"False","Error":"..."}`. Both layers are checked here.

use super::ApiError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Response", default)]
    response: Option<String>,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

pub struct OmdbResponseHandler;

impl OmdbResponseHandler {
    pub async fn extract_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Self::extract_error(status.as_u16(), text);
        }

        Self::parse_body(&text)
    }

    fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(|e| {
            tracing::error!("Failed to parse response: {}, body: {}", e, text);
            ApiError::ParseError(e.to_string())
        })?;

        if envelope
            .response
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("false"))
        {
            let message = envelope
                .error
                .unwrap_or_else(|| "unknown error".to_string());
            tracing::debug!("OMDb reported failure: {}", message);
            return Err(ApiError::Omdb(message));
        }

        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to parse response: {}, body: {}", e, text);
            ApiError::ParseError(e.to_string())
        })
    }

    fn extract_error<T>(status: u16, text: String) -> Result<T, ApiError> {
        let message = serde_json::from_str::<Envelope>(&text)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or(text);

        if status == 401 {
            return Err(ApiError::AuthError(message));
        }

        Err(ApiError::HttpStatus { status, message })
    }
}
