//! In-memory cookie jar.
//!
//! Seeded from a `Cookie` request header; expirations are recorded as
//! `Set-Cookie` values so a server integration can forward them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fylinde_auth_application::ports::CookieJar;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct JarState {
    cookies: BTreeMap<String, String>,
    set_cookies: Vec<String>,
}

/// Cookie jar backed by a map.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    state: Mutex<JarState>,
}

impl MemoryCookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `Cookie` header such as `token=abc; theme=dark`.
    ///
    /// Pairs without `=` are skipped; surrounding double quotes are removed
    /// from values.
    #[must_use]
    pub fn from_cookie_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| {
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                (name.trim().to_string(), value.to_string())
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Self {
            state: Mutex::new(JarState {
                cookies,
                set_cookies: Vec::new(),
            }),
        }
    }

    /// Sets a cookie.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state.lock().cookies.insert(name.into(), value.into());
    }

    /// `Set-Cookie` values produced by expirations, oldest first.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.state.lock().set_cookies.clone()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.state.lock().cookies.get(name).cloned()
    }

    fn expire(&self, name: &str, path: &str) {
        let expires = DateTime::<Utc>::UNIX_EPOCH.format("%a, %d %b %Y %H:%M:%S GMT");
        let mut state = self.state.lock();
        state.cookies.remove(name);
        state
            .set_cookies
            .push(format!("{name}=; Expires={expires}; Path={path}"));
    }
}
