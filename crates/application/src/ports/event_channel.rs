//! Publish/subscribe port for cross-context notifications.

use fylinde_auth_domain::AuthChannelEvent;
use tokio::sync::broadcast;

/// Topic on which storage writes made by other execution contexts arrive.
pub const STORAGE_CHANGE_TOPIC: &str = "storage";

/// A topic-keyed broadcast channel.
///
/// Delivery is best-effort and ordering across contexts is not guaranteed.
pub trait EventChannel: Send + Sync {
    /// Publishes an event to every current subscriber of `topic`.
    fn publish(&self, topic: &str, event: AuthChannelEvent);

    /// Subscribes to `topic`. Only events published after this call are received.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<AuthChannelEvent>;
}
