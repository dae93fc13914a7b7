//! `AuthBackend` over GraphQL.

use std::sync::Arc;

use fylinde_auth_application::AuthClientConfig;
use fylinde_auth_application::ports::{AuthBackend, BackendError, HttpClient};
use fylinde_auth_domain::{
    AuthRequest, GraphqlResponse, Header, PasswordResetResponse, PasswordResetVariables,
    TokenCreateResponse, TokenCreateVariables, TokenRefreshResponse, TokenRefreshVariables,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::mutations::{PASSWORD_RESET, TOKEN_CREATE, TOKEN_REFRESH};

/// Posts the credential mutations to the API URL.
///
/// Requests carry the configured default headers and never an
/// `Authorization` header.
pub struct GraphqlAuthBackend<C> {
    http_client: Arc<C>,
    api_url: String,
    default_headers: Vec<Header>,
}

impl<C: HttpClient> GraphqlAuthBackend<C> {
    /// Creates a backend for the configured API URL.
    #[must_use]
    pub fn new(http_client: Arc<C>, config: &AuthClientConfig) -> Self {
        Self {
            http_client,
            api_url: config.api_url.clone(),
            default_headers: config.headers().collect(),
        }
    }

    fn request<V: Serialize>(&self, query: &str, variables: &V) -> Result<AuthRequest, BackendError> {
        let body = serde_json::json!({
            "query": query,
            "variables": serde_json::to_value(variables)
                .map_err(|e| BackendError::Decode(e.to_string()))?,
        });
        Ok(self
            .default_headers
            .iter()
            .cloned()
            .fold(AuthRequest::post_json(&self.api_url, &body), AuthRequest::with_header))
    }

    async fn execute<V, T>(
        &self,
        operation: &'static str,
        query: &str,
        variables: &V,
    ) -> Result<GraphqlResponse<T>, BackendError>
    where
        V: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(query, variables)?;
        let response = self.http_client.execute(&request).await?;

        match response.json::<GraphqlResponse<T>>() {
            Ok(parsed) => {
                tracing::debug!(
                    operation,
                    status = response.status,
                    errors = parsed.errors.len(),
                    "exchange completed"
                );
                Ok(parsed)
            }
            Err(_) if !response.is_success() => Err(BackendError::Status {
                status: response.status,
            }),
            Err(e) => Err(BackendError::Decode(e.to_string())),
        }
    }
}

impl<C: HttpClient> AuthBackend for GraphqlAuthBackend<C> {
    async fn token_create(
        &self,
        variables: &TokenCreateVariables,
    ) -> Result<TokenCreateResponse, BackendError> {
        self.execute("tokenCreate", TOKEN_CREATE, variables).await
    }

    async fn token_refresh(&self, refresh_token: &str) -> Result<TokenRefreshResponse, BackendError> {
        let variables = TokenRefreshVariables {
            refresh_token: refresh_token.to_string(),
        };
        self.execute("tokenRefresh", TOKEN_REFRESH, &variables).await
    }

    async fn set_password(
        &self,
        variables: &PasswordResetVariables,
    ) -> Result<PasswordResetResponse, BackendError> {
        self.execute("setPassword", PASSWORD_RESET, variables).await
    }
}
