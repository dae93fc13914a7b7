//! Key/value storage port

/// A key/value medium holding tokens and session state.
///
/// No validation happens at this boundary. Implementations that can fail
/// (files, OS keychains) log the failure and behave as if the key were
/// absent, so the request path never sees a storage error.
pub trait StorageRepository: Send + Sync {
    /// Reads the value stored under `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str);

    /// Removes `key`. Removing a missing key is a no-op.
    fn remove_item(&self, key: &str);
}
