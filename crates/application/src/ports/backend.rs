//! Backend credential exchange port

use std::future::Future;

use fylinde_auth_domain::{
    PasswordResetResponse, PasswordResetVariables, TokenCreateResponse, TokenCreateVariables,
    TokenRefreshResponse,
};
use thiserror::Error;

use super::HttpClientError;

/// Failures of the exchange itself, as opposed to rejections the backend
/// reports inside a well-formed response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] HttpClientError),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body was not in the expected shape.
    #[error("invalid backend response: {0}")]
    Decode(String),
}

/// The opaque sign-in / refresh / password-reset exchange.
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges primary credentials for an access and refresh token.
    ///
    /// # Errors
    ///
    /// Returns a `BackendError` if no response could be obtained.
    fn token_create(
        &self,
        variables: &TokenCreateVariables,
    ) -> impl Future<Output = Result<TokenCreateResponse, BackendError>> + Send;

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns a `BackendError` if no response could be obtained.
    fn token_refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenRefreshResponse, BackendError>> + Send;

    /// Sets a new password with a reset token and signs in.
    ///
    /// # Errors
    ///
    /// Returns a `BackendError` if no response could be obtained.
    fn set_password(
        &self,
        variables: &PasswordResetVariables,
    ) -> impl Future<Output = Result<PasswordResetResponse, BackendError>> + Send;
}
