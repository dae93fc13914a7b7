//! Token persistence handlers.
//!
//! The access token lives in an ephemeral medium (in-memory by default), the
//! refresh token and session state in a durable one. Both handlers only
//! know their namespaced key; validation happens elsewhere.

use std::collections::HashMap;
use std::sync::Arc;

use fylinde_auth_domain::{SessionState, StorageKeys};
use parking_lot::RwLock;

use super::notifier::SessionStateNotifier;
use crate::ports::StorageRepository;

/// Thread-safe in-memory storage medium.
///
/// Each client constructs its own; nothing is shared implicitly.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl StorageRepository for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items.write().insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        self.items.write().remove(key);
    }
}

/// Reads and writes the access token.
#[derive(Clone)]
pub struct AccessTokenStorage {
    storage: Arc<dyn StorageRepository>,
    key: String,
}

impl AccessTokenStorage {
    /// Creates a handler over `storage` using the namespace in `keys`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageRepository>, keys: &StorageKeys) -> Self {
        Self {
            storage,
            key: keys.access_token.clone(),
        }
    }

    /// Returns the stored access token, treating an empty value as absent.
    #[must_use]
    pub fn get_access_token(&self) -> Option<String> {
        self.storage
            .get_item(&self.key)
            .filter(|token| !token.is_empty())
    }

    /// Stores the access token.
    pub fn set_access_token(&self, token: &str) {
        self.storage.set_item(&self.key, token);
    }

    /// Removes the access token.
    pub fn clear_auth_storage(&self) {
        self.storage.remove_item(&self.key);
    }
}

/// Reads and writes the refresh token; clears the session on sign-out.
#[derive(Clone)]
pub struct RefreshTokenStorage {
    storage: Arc<dyn StorageRepository>,
    key: String,
    notifier: SessionStateNotifier,
}

impl RefreshTokenStorage {
    /// Creates a handler over `storage`. The notifier must persist into the
    /// same medium so the state travels with the refresh token.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageRepository>,
        keys: &StorageKeys,
        notifier: SessionStateNotifier,
    ) -> Self {
        Self {
            storage,
            key: keys.refresh_token.clone(),
            notifier,
        }
    }

    /// Returns the stored refresh token, treating an empty value as absent.
    #[must_use]
    pub fn get_refresh_token(&self) -> Option<String> {
        self.storage
            .get_item(&self.key)
            .filter(|token| !token.is_empty())
    }

    /// Stores the refresh token.
    pub fn set_refresh_token(&self, token: &str) {
        self.storage.set_item(&self.key, token);
    }

    /// Marks the session signed out and removes the refresh token.
    pub fn clear_auth_storage(&self) {
        self.notifier.set_state(SessionState::SignedOut);
        self.storage.remove_item(&self.key);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::LocalEventChannel;
    use pretty_assertions::assert_eq;

    fn keys() -> StorageKeys {
        StorageKeys::new(Some("http://a/graphql/"))
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.set_item("k", "v");
        assert_eq!(storage.get_item("k").as_deref(), Some("v"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("k");
        storage.remove_item("missing");
        assert!(storage.get_item("k").is_none());
    }

    #[test]
    fn test_access_token_uses_namespaced_key() {
        let medium = MemoryStorage::new();
        let access = AccessTokenStorage::new(Arc::new(medium.clone()), &keys());

        access.set_access_token("abc");
        assert_eq!(
            medium.get_item("http://a/graphql/+fylinde_auth_access_token").as_deref(),
            Some("abc")
        );

        access.clear_auth_storage();
        assert!(access.get_access_token().is_none());
    }

    #[test]
    fn test_empty_refresh_token_is_absent() {
        let medium = Arc::new(MemoryStorage::new());
        let notifier =
            SessionStateNotifier::new(medium.clone(), Arc::new(LocalEventChannel::new()), &keys());
        let refresh = RefreshTokenStorage::new(medium, &keys(), notifier);

        refresh.set_refresh_token("");
        assert!(refresh.get_refresh_token().is_none());
    }

    #[test]
    fn test_clear_refresh_storage_signs_out() {
        let medium = Arc::new(MemoryStorage::new());
        let notifier =
            SessionStateNotifier::new(medium.clone(), Arc::new(LocalEventChannel::new()), &keys());
        notifier.set_state(SessionState::SignedIn);
        let refresh = RefreshTokenStorage::new(medium, &keys(), notifier.clone());

        refresh.set_refresh_token("refresh");
        refresh.clear_auth_storage();

        assert!(refresh.get_refresh_token().is_none());
        assert_eq!(notifier.get_state(), SessionState::SignedOut);
    }
}
