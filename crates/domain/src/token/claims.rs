//! JWT claim decoding and expiry checks.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding a token's claims.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token does not have the `header.payload.signature` shape.
    #[error("token is not a three-part JWT")]
    Malformed,

    /// The payload segment is not valid base64url.
    #[error("token payload is not valid base64: {0}")]
    InvalidEncoding(String),

    /// The payload is not a JSON claims object.
    #[error("token payload is not valid JSON: {0}")]
    InvalidClaims(String),

    /// A required claim is absent.
    #[error("token has no `{0}` claim")]
    MissingClaim(&'static str),
}

/// Claims carried in an access token payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Origin that minted the token.
    #[serde(default)]
    pub iss: Option<String>,
    /// Expiry as seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued-at as seconds since the epoch.
    #[serde(default)]
    pub iat: Option<i64>,
    /// Account email, when the backend includes it.
    #[serde(default)]
    pub email: Option<String>,
    /// Token kind (`access`, `refresh`, ...).
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
}

impl TokenClaims {
    /// Expiry as a UTC timestamp, if present and representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Decodes the claims of a token without verifying its signature.
///
/// # Errors
///
/// Returns a `TokenError` if the token is not a JWT or its payload cannot
/// be decoded.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenError::InvalidEncoding(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::InvalidClaims(e.to_string()))
}

/// Extracts the `iss` claim.
///
/// # Errors
///
/// Returns a `TokenError` if the token cannot be decoded or has no issuer.
pub fn decode_issuer(token: &str) -> Result<String, TokenError> {
    decode_claims(token)?
        .iss
        .ok_or(TokenError::MissingClaim("iss"))
}

/// Returns true if `now + grace >= exp`.
///
/// Tokens that cannot be decoded, or that carry no expiry, count as expired.
#[must_use]
pub fn is_expired(token: &str, grace: Duration, now: DateTime<Utc>) -> bool {
    decode_claims(token)
        .ok()
        .and_then(|claims| claims.expires_at())
        .is_none_or(|expires_at| now + grace >= expires_at)
}
