//! In-process event channel.

use std::collections::HashMap;

use fylinde_auth_domain::AuthChannelEvent;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::ports::EventChannel;

const DEFAULT_CAPACITY: usize = 64;

/// Topic-keyed broadcast channel confined to the current process.
///
/// Cross-process adapters implement the same port; this one also serves
/// tests by letting them inject `StorageChanged` events directly.
#[derive(Debug)]
pub struct LocalEventChannel {
    topics: Mutex<HashMap<String, broadcast::Sender<AuthChannelEvent>>>,
    capacity: usize,
}

impl LocalEventChannel {
    /// Creates a channel with the default per-topic buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a channel buffering `capacity` events per topic.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<AuthChannelEvent> {
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for LocalEventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel for LocalEventChannel {
    fn publish(&self, topic: &str, event: AuthChannelEvent) {
        // No subscribers is not an error.
        let _ = self.sender(topic).send(event);
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<AuthChannelEvent> {
        self.sender(topic).subscribe()
    }
}
