//! Port adapters

mod cookie_jar;
mod reqwest_client;

pub use cookie_jar::MemoryCookieJar;
pub use reqwest_client::ReqwestHttpClient;
