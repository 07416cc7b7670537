//! Error types for octopus-api

use thiserror::Error;

/// Errors that can occur while talking to the deployment server
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (connect, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("Octopus returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body could not be decoded
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client configuration is unusable (bad host URL, bad API key)
    #[error("Invalid server configuration: {0}")]
    InvalidConfig(String),

    /// A resource an operation depends on does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Whether the failure happened before the server gave an answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Http(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ApiError::Http(format!("failed to decode response: {err}"));
        }
        ApiError::Http(err.to_string())
    }
}
