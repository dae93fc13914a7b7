//! Events carried by the cross-context notification channel.

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// A change to a key in a storage medium shared between execution contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    /// The key that changed.
    pub key: String,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change.
    pub new_value: Option<String>,
}

impl StorageChange {
    /// Returns true if the value actually changed.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.old_value != self.new_value
    }
}

/// Payload published on an event channel topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthChannelEvent {
    /// A shared storage key was written by some context.
    StorageChanged(StorageChange),
    /// The session state of a namespace changed.
    #[serde(rename_all = "camelCase")]
    AuthStateChanged {
        /// The new state.
        auth_state: SessionState,
    },
}
