//! GraphQL credential exchange.

mod backend;
pub mod mutations;

pub use backend::GraphqlAuthBackend;
