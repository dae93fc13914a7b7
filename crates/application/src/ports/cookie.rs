//! Cookie port used for the server-to-client token handoff.

/// Name of the cookie a server may use to hand an access token to the client.
pub const HANDOFF_COOKIE: &str = "token";

/// Access to the cookies of the current execution context.
pub trait CookieJar: Send + Sync {
    /// Reads a cookie value.
    fn get(&self, name: &str) -> Option<String>;

    /// Expires a cookie by overwriting it with an empty value dated at the epoch.
    fn expire(&self, name: &str, path: &str);
}
