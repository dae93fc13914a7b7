//! Configuration loading.

mod loader;

pub use loader::{ConfigLoader, ENV_PREFIX};
