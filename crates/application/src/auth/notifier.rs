//! Session state persistence and broadcast.
//!
//! `set_state` persists the state next to the refresh token and publishes an
//! `AuthStateChanged` event on the namespace's auth event topic. When
//! listening, writes to the state key made by other execution contexts
//! (delivered on [`STORAGE_CHANGE_TOPIC`]) are re-published locally so
//! in-process observers follow out-of-process sign-outs.

use std::sync::Arc;

use fylinde_auth_domain::{AuthChannelEvent, SessionState, StorageChange, StorageKeys};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::ports::{EventChannel, STORAGE_CHANGE_TOPIC, StorageRepository};

/// Owns the storage-change listener task; aborts it when dropped.
#[derive(Debug)]
pub struct ListenerGuard {
    handle: JoinHandle<()>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct NotifierInner {
    storage: Arc<dyn StorageRepository>,
    channel: Arc<dyn EventChannel>,
    state_key: String,
    event_topic: String,
    listener: Mutex<Option<ListenerGuard>>,
}

/// Persists and broadcasts `SessionState` for one namespace.
#[derive(Clone)]
pub struct SessionStateNotifier {
    inner: Arc<NotifierInner>,
}

impl SessionStateNotifier {
    /// Creates a notifier. It does not listen until [`Self::listen`] is called.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageRepository>,
        channel: Arc<dyn EventChannel>,
        keys: &StorageKeys,
    ) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                storage,
                channel,
                state_key: keys.auth_state.clone(),
                event_topic: keys.auth_event.clone(),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Persists `state` and broadcasts it.
    pub fn set_state(&self, state: SessionState) {
        self.inner.storage.set_item(&self.inner.state_key, state.as_str());
        self.send_auth_state_event(state);
    }

    /// Reads the persisted state; missing or unknown values read as `SignedOut`.
    #[must_use]
    pub fn get_state(&self) -> SessionState {
        self.inner
            .storage
            .get_item(&self.inner.state_key)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Subscribes to auth-state events of this namespace.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChannelEvent> {
        self.inner.channel.subscribe(&self.inner.event_topic)
    }

    /// Starts re-broadcasting external changes of the state key.
    ///
    /// Returns true if a listener is running after the call. Calling it again
    /// while listening does not attach a second listener. Without a tokio
    /// runtime nothing is attached and false is returned.
    pub fn listen(&self) -> bool {
        let mut listener = self.inner.listener.lock();
        if listener.as_ref().is_some_and(|guard| !guard.handle.is_finished()) {
            return true;
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!("no tokio runtime, storage change listener not attached");
            return false;
        };

        let receiver = self.inner.channel.subscribe(STORAGE_CHANGE_TOPIC);
        let handle = runtime.spawn(forward_storage_changes(
            receiver,
            Arc::clone(&self.inner.channel),
            self.inner.state_key.clone(),
            self.inner.event_topic.clone(),
        ));
        *listener = Some(ListenerGuard { handle });
        drop(listener);

        tracing::debug!(key = %self.inner.state_key, "storage change listener attached");
        true
    }

    /// Returns true while the storage-change listener is attached.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.inner
            .listener
            .lock()
            .as_ref()
            .is_some_and(|guard| !guard.handle.is_finished())
    }

    /// Detaches the storage-change listener. Safe to call repeatedly.
    pub fn cleanup(&self) {
        if self.inner.listener.lock().take().is_some() {
            tracing::debug!(key = %self.inner.state_key, "storage change listener detached");
        }
    }

    fn send_auth_state_event(&self, auth_state: SessionState) {
        self.inner.channel.publish(
            &self.inner.event_topic,
            AuthChannelEvent::AuthStateChanged { auth_state },
        );
    }
}

async fn forward_storage_changes(
    mut receiver: broadcast::Receiver<AuthChannelEvent>,
    channel: Arc<dyn EventChannel>,
    state_key: String,
    event_topic: String,
) {
    loop {
        match receiver.recv().await {
            Ok(AuthChannelEvent::StorageChanged(change)) => {
                if let Some(auth_state) = external_state_change(&change, &state_key) {
                    channel.publish(&event_topic, AuthChannelEvent::AuthStateChanged { auth_state });
                }
            }
            Ok(AuthChannelEvent::AuthStateChanged { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "storage change listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// The state another context wrote, if `change` is a real change of `state_key`.
fn external_state_change(change: &StorageChange, state_key: &str) -> Option<SessionState> {
    if change.key != state_key || !change.is_change() {
        return None;
    }
    Some(
        change
            .new_value
            .as_deref()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default(),
    )
}
