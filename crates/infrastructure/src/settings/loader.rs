//! Loads `AuthClientConfig` from a file and the environment.

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use fylinde_auth_application::config::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_TOKEN_GRACE_PERIOD_MS};
use fylinde_auth_application::{AuthClientConfig, ConfigError};

/// Prefix of the environment variables read by default.
pub const ENV_PREFIX: &str = "FYLINDE_AUTH";

/// Layered configuration source.
///
/// Later layers win: built-in defaults, then the optional file (format from
/// its extension), then environment variables such as
/// `FYLINDE_AUTH_API_URL` or `FYLINDE_AUTH_DEFAULT_HEADERS__X_CHANNEL` (keys are lowercased).
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    file_required: bool,
    env_prefix: String,
    env_vars: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            file: None,
            file_required: false,
            env_prefix: ENV_PREFIX.to_string(),
            env_vars: None,
        }
    }
}

impl ConfigLoader {
    /// Creates a loader reading only the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `path`, failing if it does not exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = true;
        self
    }

    /// Reads `path` if it exists.
    #[must_use]
    pub fn with_optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = false;
        self
    }

    /// Uses another environment variable prefix.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Reads environment overrides from `vars` instead of the process
    /// environment.
    #[must_use]
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or the result
    /// does not deserialize, or the errors of `AuthClientConfig::validate`.
    pub fn load(&self) -> Result<AuthClientConfig, ConfigError> {
        let mut builder = Config::builder()
            .set_default("token_grace_period_ms", DEFAULT_TOKEN_GRACE_PERIOD_MS)
            .and_then(|b| b.set_default("request_timeout_ms", DEFAULT_REQUEST_TIMEOUT_MS))
            .map_err(load_error)?;

        if let Some(path) = &self.file {
            builder = builder.add_source(File::from(path.as_path()).required(self.file_required));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_vars.clone()),
        );

        let config: AuthClientConfig = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(load_error)?;
        config.validate()?;

        tracing::debug!(
            api_url = %config.api_url,
            file = ?self.file,
            "configuration loaded"
        );
        Ok(config)
    }
}

fn load_error(error: config::ConfigError) -> ConfigError {
    ConfigError::Load(error.to_string())
}
