//! Error types for the Opsview client

use thiserror::Error;

/// Errors that can occur when talking to the Opsview REST API
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// API returned an error status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Neither a token nor a password was usable for the session
    #[error("authentication failed: {0}")]
    Auth(String),

    /// TLS verification setting could not be applied
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
