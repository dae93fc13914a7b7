//! File-backed durable storage.
//!
//! Stores the refresh token and session state of every namespace in one JSON
//! object in the platform data directory:
//! - Linux: ~/.local/share/fylinde-auth/session.json
//! - macOS: ~/Library/Application Support/fylinde-auth/session.json
//! - Windows: %APPDATA%/fylinde-auth/session.json

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fylinde_auth_application::ports::{EventChannel, STORAGE_CHANGE_TOPIC, StorageRepository};
use fylinde_auth_domain::{AuthChannelEvent, StorageChange};
use parking_lot::RwLock;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for file storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a JSON object of strings.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Could not determine the data directory.
    #[error("could not determine data directory")]
    NoDataDir,
}

/// Storage medium persisted as a JSON file.
///
/// Reads are served from memory. A write re-reads the file, changes only its
/// own key and writes the result back, so keys another process wrote in the
/// meantime are kept. Write failures are logged and the in-memory value is
/// kept, so the session keeps working for the lifetime of the process.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    snapshot: RwLock<Snapshot>,
}

#[derive(Debug, Default)]
struct Snapshot {
    items: BTreeMap<String, String>,
    /// External changes picked up by writes and not yet returned by `reload`.
    unsynced: BTreeMap<String, StorageChange>,
}

impl Snapshot {
    /// Replaces the cached items with `fresh`, remembering what differed.
    fn absorb(&mut self, fresh: BTreeMap<String, String>) {
        let mut keys: Vec<String> = self.items.keys().chain(fresh.keys()).cloned().collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            let old_value = self.items.get(&key).cloned();
            let new_value = fresh.get(&key).cloned();
            if old_value == new_value {
                continue;
            }
            let change = self
                .unsynced
                .entry(key.clone())
                .or_insert_with(|| StorageChange {
                    key,
                    old_value,
                    new_value: None,
                });
            change.new_value = new_value;
            if !change.is_change() {
                let key = change.key.clone();
                self.unsynced.remove(&key);
            }
        }
        self.items = fresh;
    }
}

impl JsonFileStorage {
    /// Opens the storage at `path`, loading it if the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let items = read_items(&path)?;
        tracing::debug!(path = %path.display(), entries = items.len(), "session storage opened");
        Ok(Self {
            path,
            snapshot: RwLock::new(Snapshot {
                items,
                unsynced: BTreeMap::new(),
            }),
        })
    }

    /// Opens the storage at [`Self::default_path`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NoDataDir` if the platform has no data
    /// directory, or the errors of [`Self::open`].
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(Self::default_path().ok_or(StorageError::NoDataDir)?)
    }

    /// Returns the platform default location, if available.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("fylinde-auth").join("session.json"))
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file and returns the keys another process changed since
    /// the last read or write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed; the in-memory
    /// state is then left untouched.
    pub fn reload(&self) -> Result<Vec<StorageChange>, StorageError> {
        let fresh = read_items(&self.path)?;
        let mut snapshot = self.snapshot.write();
        snapshot.absorb(fresh);
        Ok(std::mem::take(&mut snapshot.unsynced).into_values().collect())
    }

    /// Reloads and publishes each external change on the storage-change
    /// topic of `channel`. Returns the number of changes published.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::reload`].
    pub fn sync_external_changes(&self, channel: &dyn EventChannel) -> Result<usize, StorageError> {
        let changes = self.reload()?;
        let count = changes.len();
        for change in changes {
            tracing::debug!(key = %change.key, "external storage change");
            channel.publish(STORAGE_CHANGE_TOPIC, AuthChannelEvent::StorageChanged(change));
        }
        Ok(count)
    }

    /// Brings the snapshot up to date with the file before a write. An
    /// unreadable file is logged and the cached items are written over it.
    fn refresh_before_write(&self, snapshot: &mut Snapshot) {
        match read_items(&self.path) {
            Ok(fresh) => snapshot.absorb(fresh),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to re-read session storage");
            }
        }
    }

    fn persist(&self, items: &BTreeMap<String, String>) {
        if let Err(e) = write_items(&self.path, items) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist session storage");
        }
    }
}

impl StorageRepository for JsonFileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.snapshot.read().items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut snapshot = self.snapshot.write();
        self.refresh_before_write(&mut snapshot);
        snapshot.items.insert(key.to_string(), value.to_string());
        self.persist(&snapshot.items);
    }

    fn remove_item(&self, key: &str) {
        let mut snapshot = self.snapshot.write();
        self.refresh_before_write(&mut snapshot);
        if snapshot.items.remove(key).is_some() {
            self.persist(&snapshot.items);
        }
    }
}

fn read_items(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Writes 2-space indented JSON with a trailing newline through a temporary
/// file so readers never see a partial write.
fn write_items(path: &Path, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"  "));
    serde::Serialize::serialize(items, &mut serializer)?;
    buffer.push(b'\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &buffer)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path().join("session.json")).unwrap();
        assert_eq!(storage.get_item("anything"), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = JsonFileStorage::open(&path).unwrap();
        storage.set_item("a+fylinde_auth_module_refresh_token", "refresh");
        storage.set_item("a+fylinde_auth_module_auth_state", "signedIn");
        storage.remove_item("a+fylinde_auth_module_auth_state");
        drop(storage);

        let reopened = JsonFileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("a+fylinde_auth_module_refresh_token").as_deref(),
            Some("refresh")
        );
        assert_eq!(reopened.get_item("a+fylinde_auth_module_auth_state"), None);
    }

    #[test]
    fn test_file_format_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = JsonFileStorage::open(&path).unwrap();
        storage.set_item("b", "2");
        storage.set_item("a", "1");

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n  \"a\": \"1\",\n  \"b\": \"2\"\n}\n");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileStorage::open(&path),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_reload_reports_external_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let ours = JsonFileStorage::open(&path).unwrap();
        ours.set_item("state", "signedIn");
        ours.set_item("untouched", "x");

        let theirs = JsonFileStorage::open(&path).unwrap();
        theirs.set_item("state", "signedOut");
        theirs.set_item("added", "y");

        let changes = ours.reload().unwrap();
        assert_eq!(
            changes,
            vec![
                StorageChange {
                    key: "added".to_string(),
                    old_value: None,
                    new_value: Some("y".to_string()),
                },
                StorageChange {
                    key: "state".to_string(),
                    old_value: Some("signedIn".to_string()),
                    new_value: Some("signedOut".to_string()),
                },
            ]
        );
        assert_eq!(ours.get_item("state").as_deref(), Some("signedOut"));
        assert!(ours.reload().unwrap().is_empty());
    }

    #[test]
    fn test_stale_writer_keeps_external_sign_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let ours = JsonFileStorage::open(&path).unwrap();
        ours.set_item("refresh", "token");
        ours.set_item("state", "signedIn");

        let theirs = JsonFileStorage::open(&path).unwrap();
        theirs.set_item("state", "signedOut");
        theirs.remove_item("refresh");

        ours.set_item("other", "x");

        let reopened = JsonFileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("refresh"), None);
        assert_eq!(reopened.get_item("state").as_deref(), Some("signedOut"));
        assert_eq!(reopened.get_item("other").as_deref(), Some("x"));
        assert_eq!(ours.get_item("refresh"), None);
    }

    #[test]
    fn test_changes_absorbed_by_a_write_are_still_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let ours = JsonFileStorage::open(&path).unwrap();
        ours.set_item("state", "signedIn");

        let theirs = JsonFileStorage::open(&path).unwrap();
        theirs.set_item("state", "signedOut");
        ours.set_item("other", "x");

        assert_eq!(
            ours.reload().unwrap(),
            vec![StorageChange {
                key: "state".to_string(),
                old_value: Some("signedIn".to_string()),
                new_value: Some("signedOut".to_string()),
            }]
        );
        assert!(ours.reload().unwrap().is_empty());
    }

    #[test]
    fn test_removing_a_key_only_another_process_wrote() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let ours = JsonFileStorage::open(&path).unwrap();

        let theirs = JsonFileStorage::open(&path).unwrap();
        theirs.set_item("refresh", "token");

        ours.remove_item("refresh");

        assert_eq!(JsonFileStorage::open(&path).unwrap().get_item("refresh"), None);
    }

    #[test]
    fn test_default_path() {
        if let Some(path) = JsonFileStorage::default_path() {
            assert!(path.ends_with("fylinde-auth/session.json"));
        }
    }
}
