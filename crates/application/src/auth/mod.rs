//! Session management.
//!
//! This module provides:
//! - Access and refresh token storage handlers
//! - Session state persistence and cross-context broadcast
//! - Single-flight token refresh coordination
//! - Issuer-checked request dispatch and the `AuthClient` facade

mod channel;
mod client;
mod coordinator;
mod dispatcher;
mod notifier;
mod token_store;

pub use channel::LocalEventChannel;
pub use client::{AuthClient, AuthClientBuilder};
pub use coordinator::{
    AuthRefreshCallback, Authorization, RefreshCoordinator, RefreshOutcome, RefreshState,
};
pub use dispatcher::{AuthorizedDispatcher, decorate};
pub use notifier::{ListenerGuard, SessionStateNotifier};
pub use token_store::{AccessTokenStorage, MemoryStorage, RefreshTokenStorage};
