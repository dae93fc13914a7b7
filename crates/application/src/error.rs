//! Application error types

use fylinde_auth_domain::DomainError;
use thiserror::Error;

use crate::ports::{BackendError, HttpClientError};

/// Errors returned by the session operations of `AuthClient`.
///
/// Rejections reported by the backend are not errors; they come back inside
/// the exchange response and leave the session signed out.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential exchange could not be completed.
    #[error("backend exchange failed: {0}")]
    Backend(#[from] BackendError),

    /// The caller's own request failed in transport.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpClientError),

    /// The client was misconfigured.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration and construction errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API URL is missing or not absolute.
    #[error("invalid API URL '{url}': {reason}")]
    InvalidApiUrl {
        /// The offending value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A default header is not a valid header.
    #[error("invalid default header: {0}")]
    InvalidHeader(#[from] DomainError),

    /// A required component was not supplied to the builder.
    #[error("missing component: {0}")]
    MissingComponent(&'static str),

    /// The configuration source could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Result type alias for session operations.
pub type AuthResult<T> = Result<T, AuthError>;
