//! Session state and storage key namespacing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const ACCESS_TOKEN_SUFFIX: &str = "fylinde_auth_access_token";
const REFRESH_TOKEN_SUFFIX: &str = "fylinde_auth_module_refresh_token";
const AUTH_STATE_SUFFIX: &str = "fylinde_auth_module_auth_state";
const AUTH_EVENT_SUFFIX: &str = "fylinde_storage_auth_change";

/// Coarse signed-in/signed-out flag shared across execution contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// A credential exchange succeeded and tokens are stored.
    SignedIn,
    /// No usable session.
    #[default]
    SignedOut,
}

impl SessionState {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "signedIn",
            Self::SignedOut => "signedOut",
        }
    }

    /// Returns true for `SignedIn`.
    #[must_use]
    pub const fn is_signed_in(self) -> bool {
        matches!(self, Self::SignedIn)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signedIn" => Ok(Self::SignedIn),
            "signedOut" => Ok(Self::SignedOut),
            other => Err(DomainError::UnknownSessionState(other.to_string())),
        }
    }
}

/// Storage keys and event topic for one session namespace.
///
/// Each key is the optional prefix and a fixed suffix joined with `+`, so
/// several sessions can share one storage medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Key of the access token.
    pub access_token: String,
    /// Key of the refresh token.
    pub refresh_token: String,
    /// Key of the persisted `SessionState`.
    pub auth_state: String,
    /// Topic on which auth-state changes are broadcast.
    pub auth_event: String,
}

impl StorageKeys {
    /// Builds the keys for the given prefix. An empty prefix means none.
    #[must_use]
    pub fn new(prefix: Option<&str>) -> Self {
        Self {
            access_token: namespaced(prefix, ACCESS_TOKEN_SUFFIX),
            refresh_token: namespaced(prefix, REFRESH_TOKEN_SUFFIX),
            auth_state: namespaced(prefix, AUTH_STATE_SUFFIX),
            auth_event: namespaced(prefix, AUTH_EVENT_SUFFIX),
        }
    }
}

fn namespaced(prefix: Option<&str>, suffix: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}+{suffix}"),
        _ => suffix.to_string(),
    }
}
