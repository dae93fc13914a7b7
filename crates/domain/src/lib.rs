//! Fylinde Auth Domain - Core session types
//!
//! This crate defines the domain model for the Fylinde auth session manager.
//! All types here are pure Rust with no I/O dependencies.

pub mod error;
pub mod event;
pub mod exchange;
pub mod request;
pub mod response;
pub mod session;
pub mod token;

pub use error::{DomainError, DomainResult};
pub use event::{AuthChannelEvent, StorageChange};
pub use exchange::{
    AccountError, GraphqlError, GraphqlResponse, PasswordResetResponse, PasswordResetVariables,
    SetPasswordData, SignInResponse, TokenCreateData, TokenCreateResponse, TokenCreateVariables,
    TokenPayload, TokenRefreshData, TokenRefreshPayload, TokenRefreshResponse,
    TokenRefreshVariables,
};
pub use request::{AuthRequest, FetchOptions, Header, Headers, HttpMethod};
pub use response::HttpResponse;
pub use session::{SessionState, StorageKeys};
pub use token::{TokenClaims, TokenError, decode_claims, decode_issuer, is_expired, token_preview};
