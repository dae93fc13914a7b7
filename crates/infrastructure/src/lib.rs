//! Fylinde Auth Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports defined in the
//! application layer: the reqwest transport, the GraphQL credential
//! exchange, file-backed storage, a cookie jar and configuration loading.

pub mod adapters;
pub mod graphql;
pub mod settings;
pub mod storage;

pub use adapters::{MemoryCookieJar, ReqwestHttpClient};
pub use graphql::GraphqlAuthBackend;
pub use settings::{ConfigLoader, ENV_PREFIX};
pub use storage::{JsonFileStorage, StorageError};
