//! Client configuration.

use std::collections::BTreeMap;

use chrono::Duration;
use fylinde_auth_domain::{DomainError, Header, StorageKeys};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Default grace period subtracted from token expiry.
pub const DEFAULT_TOKEN_GRACE_PERIOD_MS: u64 = 2000;
/// Default transport timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Settings of one `AuthClient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClientConfig {
    /// GraphQL endpoint the credential exchanges are posted to.
    pub api_url: String,

    /// Tokens expiring within this many milliseconds count as expired.
    #[serde(default = "default_grace_period")]
    pub token_grace_period_ms: u64,

    /// Storage key namespace. Defaults to `api_url`; empty means none.
    #[serde(default)]
    pub storage_prefix: Option<String>,

    /// Headers added to every backend exchange.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,

    /// Transport timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

const fn default_grace_period() -> u64 {
    DEFAULT_TOKEN_GRACE_PERIOD_MS
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl AuthClientConfig {
    /// Creates a configuration with defaults for everything but the URL.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token_grace_period_ms: DEFAULT_TOKEN_GRACE_PERIOD_MS,
            storage_prefix: None,
            default_headers: BTreeMap::new(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    /// Sets the grace period.
    #[must_use]
    pub const fn with_token_grace_period_ms(mut self, millis: u64) -> Self {
        self.token_grace_period_ms = millis;
        self
    }

    /// Sets the storage namespace.
    #[must_use]
    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = Some(prefix.into());
        self
    }

    /// Adds a default exchange header.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Storage keys for this client's namespace.
    #[must_use]
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(Some(self.storage_prefix.as_deref().unwrap_or(&self.api_url)))
    }

    /// The grace period as a duration.
    #[must_use]
    pub fn grace(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.token_grace_period_ms).unwrap_or(i64::MAX))
    }

    /// The default exchange headers as header values.
    pub fn headers(&self) -> impl Iterator<Item = Header> + '_ {
        self.default_headers
            .iter()
            .map(|(name, value)| Header::new(name.clone(), value.clone()))
    }

    /// Checks the URL and the default header names.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the API URL is not an absolute http(s) URL
    /// or a header name is empty or contains whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            reason: reason.to_string(),
        };
        let url = Url::parse(&self.api_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }

        for name in self.default_headers.keys() {
            if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == ':') {
                return Err(DomainError::InvalidHeaderName(name.clone()).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: AuthClientConfig =
            serde_json::from_str(r#"{"api_url":"https://shop.example/graphql/"}"#).unwrap();
        assert_eq!(config, AuthClientConfig::new("https://shop.example/graphql/"));
        assert_eq!(config.grace(), Duration::milliseconds(2000));
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_prefix_defaults_to_api_url() {
        let config = AuthClientConfig::new("http://a/graphql/");
        assert_eq!(
            config.storage_keys().access_token,
            "http://a/graphql/+fylinde_auth_access_token"
        );

        let config = config.with_storage_prefix("");
        assert_eq!(config.storage_keys().access_token, "fylinde_auth_access_token");
    }

    #[test]
    fn test_validate() {
        assert!(AuthClientConfig::new("http://a/graphql/").validate().is_ok());
        assert!(matches!(
            AuthClientConfig::new("not a url").validate(),
            Err(ConfigError::InvalidApiUrl { .. })
        ));
        assert!(matches!(
            AuthClientConfig::new("ftp://a/").validate(),
            Err(ConfigError::InvalidApiUrl { .. })
        ));
        assert!(matches!(
            AuthClientConfig::new("http://a/")
                .with_default_header("Bad Name", "x")
                .validate(),
            Err(ConfigError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_headers() {
        let config = AuthClientConfig::new("http://a/").with_default_header("X-Channel", "web");
        let headers: Vec<_> = config.headers().collect();
        assert_eq!(headers, vec![Header::new("X-Channel", "web")]);
    }
}
