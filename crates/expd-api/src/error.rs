//! API error types

use thiserror::Error;

/// Errors that can occur while talking to the remote API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout...)
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("Server responded with status {status} for {url}")]
    Status { url: String, status: u16 },

    /// The server answered with an `err` payload
    #[error("API error: {message}")]
    Remote {
        code: Option<String>,
        message: String,
    },

    /// The reply could not be interpreted
    #[error("Malformed API response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Create a malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Remote error code, if the server supplied one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Remote { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
