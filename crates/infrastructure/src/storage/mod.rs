//! Storage media for tokens and session state.

mod json_file;

pub use json_file::{JsonFileStorage, StorageError};
