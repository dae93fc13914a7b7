//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod backend;
mod clock;
mod cookie;
mod event_channel;
mod http_client;
mod storage;

pub use backend::{AuthBackend, BackendError};
pub use clock::{Clock, SystemClock};
pub use cookie::{CookieJar, HANDOFF_COOKIE};
pub use event_channel::{EventChannel, STORAGE_CHANGE_TOPIC};
pub use http_client::{HttpClient, HttpClientError};
pub use storage::StorageRepository;
