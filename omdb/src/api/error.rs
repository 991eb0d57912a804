use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("OMDb error: {0}")]
    Omdb(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Errors that happened before a usable response body arrived
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::RequestError(_)
                | ApiError::HttpStatus { .. }
                | ApiError::AuthError(_)
                | ApiError::InvalidUrl(_)
        )
    }
}
