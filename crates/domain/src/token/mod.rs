//! Access token inspection.
//!
//! Tokens are JWTs minted by the API. Claims are decoded without verifying
//! the signature; trust is delegated to the backend that issued them.

mod claims;

pub use claims::{TokenClaims, TokenError, decode_claims, decode_issuer, is_expired};

/// Get a preview of a token (first 8 chars + ...), safe for logs.
#[must_use]
pub fn token_preview(token: &str) -> String {
    match token.char_indices().nth(8) {
        Some((idx, _)) if token.len() > 12 => format!("{}...", &token[..idx]),
        _ => token.to_string(),
    }
}
