use thiserror::Error;

/// Errors that can occur when talking to the Sequential Data Store
#[derive(Debug, Error)]
pub enum SdsError {
    /// Request could not be sent or the response body could not be read
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response status outside [200, 300)
    #[error("Status: {status}\nBody: {body}")]
    HttpStatus { status: String, body: String },

    /// Body is not valid JSON, does not match the expected shape,
    /// or a cell could not be decoded under the active policy
    #[error("Decode error: {0}")]
    Decode(String),

    /// Delegated auth requested but no token was supplied
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration error (missing settings, invalid addressing, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Columnar conversion failure
    #[error("Frame error: {0}")]
    Frame(String),
}

impl SdsError {
    /// Build an HTTP status error from a numeric status and raw body
    pub fn http_status(code: u16, body: &[u8]) -> Self {
        let status = match reqwest::StatusCode::from_u16(code) {
            Ok(s) => s.to_string(),
            Err(_) => code.to_string(),
        };
        SdsError::HttpStatus {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

impl From<reqwest::Error> for SdsError {
    fn from(e: reqwest::Error) -> Self {
        SdsError::Transport(e.to_string())
    }
}

impl From<polars::error::PolarsError> for SdsError {
    fn from(e: polars::error::PolarsError) -> Self {
        SdsError::Frame(e.to_string())
    }
}

/// Type alias for Results using SdsError
pub type Result<T> = std::result::Result<T, SdsError>;
