//! Fylinde Auth Application - session coordination
//!
//! This crate contains the session logic of the auth client: token storage
//! handlers, the refresh coordinator, request dispatch and sign-in flows.
//! It depends on the domain crate and defines ports (traits) implemented by
//! the infrastructure layer.

pub mod auth;
pub mod config;
pub mod error;
pub mod ports;

pub use auth::{AuthClient, AuthClientBuilder, Authorization, RefreshOutcome, RefreshState};
pub use config::AuthClientConfig;
pub use error::{AuthError, AuthResult, ConfigError};
