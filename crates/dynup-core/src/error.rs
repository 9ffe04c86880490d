//! Error types for the dynup service
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dynup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dynup service
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed update request (bad hostname, bad address syntax)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Retryable zone authority error (throttling, transient network failure)
    #[error("Zone authority error ({authority}, transient): {message}")]
    AuthorityTransient {
        /// Authority name
        authority: String,
        /// Error message
        message: String,
    },

    /// Non-retryable zone authority error (validation, permission denied)
    #[error("Zone authority error ({authority}): {message}")]
    AuthorityFatal {
        /// Authority name
        authority: String,
        /// Error message
        message: String,
    },

    /// Secret store errors
    #[error("Secret store error: {0}")]
    SecretStore(String),

    /// Named secret is not set in the store
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a transient (retryable) authority error
    pub fn authority_transient(authority: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthorityTransient {
            authority: authority.into(),
            message: message.into(),
        }
    }

    /// Create a fatal (non-retryable) authority error
    pub fn authority_fatal(authority: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthorityFatal {
            authority: authority.into(),
            message: message.into(),
        }
    }

    /// Create a secret store error
    pub fn secret_store(msg: impl Into<String>) -> Self {
        Self::SecretStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the retry policy may re-attempt the failed operation.
    ///
    /// Only authority-side transient failures qualify. Authentication and
    /// validation failures are never retried: retrying cannot change their
    /// outcome.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::AuthorityTransient { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
