//! Public session facade.

use std::sync::Arc;

use fylinde_auth_domain::{
    AuthChannelEvent, AuthRequest, FetchOptions, HttpResponse, PasswordResetResponse,
    PasswordResetVariables, SessionState, SignInResponse, TokenCreateResponse,
    TokenCreateVariables, token_preview,
};
use tokio::sync::broadcast;

use super::channel::LocalEventChannel;
use super::coordinator::{
    AuthRefreshCallback, RefreshCoordinator, RefreshOutcome, RefreshState,
};
use super::dispatcher::AuthorizedDispatcher;
use super::notifier::SessionStateNotifier;
use super::token_store::{AccessTokenStorage, MemoryStorage, RefreshTokenStorage};
use crate::config::AuthClientConfig;
use crate::error::{AuthResult, ConfigError};
use crate::ports::{
    AuthBackend, Clock, CookieJar, EventChannel, HANDOFF_COOKIE, HttpClient, HttpClientError,
    StorageRepository, SystemClock,
};

/// Session manager for one backend.
///
/// Holds the tokens, refreshes the access token transparently and attaches it
/// to outgoing requests aimed at its issuer. Construct with
/// [`AuthClient::builder`].
pub struct AuthClient<C, B> {
    config: AuthClientConfig,
    backend: Arc<B>,
    access: AccessTokenStorage,
    refresh: RefreshTokenStorage,
    notifier: SessionStateNotifier,
    coordinator: RefreshCoordinator<B>,
    dispatcher: AuthorizedDispatcher<C>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
}

impl<C: HttpClient, B: AuthBackend> AuthClient<C, B> {
    /// Starts building a client for `config`.
    #[must_use]
    pub fn builder(config: AuthClientConfig) -> AuthClientBuilder<C, B> {
        AuthClientBuilder::new(config)
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &AuthClientConfig {
        &self.config
    }

    /// Sends `request`, attaching the access token when allowed and
    /// refreshing it first when it has expired.
    ///
    /// Missing or rejected credentials never fail the call; the request is
    /// then sent without them.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the caller's own request.
    pub async fn fetch_with_auth(
        &self,
        request: AuthRequest,
        options: FetchOptions,
    ) -> Result<HttpResponse, HttpClientError> {
        self.take_handoff_cookie();
        let authorization = self.coordinator.authorize().await;
        tracing::debug!(url = %request.url, ?authorization, "dispatching request");
        self.dispatcher.dispatch(request, &authorization, options).await
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the exchange could not be completed.
    /// A rejection by the backend is returned as `Ok` and leaves the session
    /// signed out.
    pub async fn sign_in(&self, variables: &TokenCreateVariables) -> AuthResult<TokenCreateResponse> {
        let response = self.backend.token_create(variables).await?;
        self.handle_sign_in(&response);
        Ok(response)
    }

    /// Sets a new password with a reset token; on success the user is signed in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the exchange could not be completed.
    pub async fn reset_password(
        &self,
        variables: &PasswordResetVariables,
    ) -> AuthResult<PasswordResetResponse> {
        let response = self.backend.set_password(variables).await?;
        self.handle_sign_in(&response);
        Ok(response)
    }

    /// Forgets both tokens and marks the session signed out. Local only.
    ///
    /// A refresh still in flight completes as
    /// [`RefreshOutcome::Superseded`] and stores nothing.
    pub fn sign_out(&self) {
        self.coordinator.change_session(|| {
            self.access.clear_auth_storage();
            self.refresh.clear_auth_storage();
        });
        if let Some(jar) = &self.cookie_jar {
            jar.expire(HANDOFF_COOKIE, "/");
        }
        tracing::info!("signed out");
    }

    /// Detaches the storage-change listener.
    pub fn cleanup(&self) {
        self.notifier.cleanup();
    }

    /// The persisted session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.notifier.get_state()
    }

    /// Subscribes to auth-state changes, local and external.
    #[must_use]
    pub fn subscribe_auth_state(&self) -> broadcast::Receiver<AuthChannelEvent> {
        self.notifier.subscribe()
    }

    /// What the next authenticated call would do with the stored credentials.
    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        self.coordinator.classify()
    }

    /// Refreshes the access token now, joining a refresh already running.
    /// Returns `None` when there is no refresh token.
    pub async fn refresh_session(&self) -> Option<RefreshOutcome> {
        self.coordinator.refresh().await
    }

    fn handle_sign_in<R: SignInResponse>(&self, response: &R) {
        let Some(payload) = response.payload() else {
            tracing::debug!("sign-in response carried no payload");
            return;
        };

        let Some(token) = payload.accepted_token() else {
            self.coordinator
                .change_session(|| self.notifier.set_state(SessionState::SignedOut));
            tracing::info!(errors = payload.errors.len(), "sign-in rejected");
            return;
        };

        self.coordinator.change_session(|| {
            self.access.set_access_token(token);
            if let Some(refresh_token) = payload.refresh_token.as_deref().filter(|t| !t.is_empty()) {
                self.refresh.set_refresh_token(refresh_token);
            }
            self.notifier.set_state(SessionState::SignedIn);
        });
        tracing::info!(token = %token_preview(token), "signed in");
    }

    fn take_handoff_cookie(&self) {
        let Some(jar) = &self.cookie_jar else {
            return;
        };
        if self.access.get_access_token().is_some() {
            return;
        }
        if let Some(token) = jar.get(HANDOFF_COOKIE).filter(|t| !t.is_empty()) {
            tracing::debug!(token = %token_preview(&token), "access token taken from cookie");
            self.access.set_access_token(&token);
        }
        jar.expire(HANDOFF_COOKIE, "/");
    }
}

/// Builder for [`AuthClient`].
pub struct AuthClientBuilder<C, B> {
    config: AuthClientConfig,
    http_client: Option<Arc<C>>,
    backend: Option<Arc<B>>,
    refresh_token_storage: Option<Arc<dyn StorageRepository>>,
    access_token_storage: Option<Arc<dyn StorageRepository>>,
    event_channel: Option<Arc<dyn EventChannel>>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    clock: Option<Arc<dyn Clock>>,
    on_auth_refresh: Option<AuthRefreshCallback>,
}

impl<C: HttpClient, B: AuthBackend> AuthClientBuilder<C, B> {
    fn new(config: AuthClientConfig) -> Self {
        Self {
            config,
            http_client: None,
            backend: None,
            refresh_token_storage: None,
            access_token_storage: None,
            event_channel: None,
            cookie_jar: None,
            clock: None,
            on_auth_refresh: None,
        }
    }

    /// Transport for authenticated requests. Required.
    #[must_use]
    pub fn http_client(mut self, http_client: Arc<C>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Credential exchange. Required.
    #[must_use]
    pub fn backend(mut self, backend: Arc<B>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Durable medium for the refresh token and session state. Required.
    #[must_use]
    pub fn refresh_token_storage(mut self, storage: Arc<dyn StorageRepository>) -> Self {
        self.refresh_token_storage = Some(storage);
        self
    }

    /// Medium for the access token. Defaults to memory owned by this client.
    #[must_use]
    pub fn access_token_storage(mut self, storage: Arc<dyn StorageRepository>) -> Self {
        self.access_token_storage = Some(storage);
        self
    }

    /// Channel for auth-state events. Defaults to an in-process channel.
    #[must_use]
    pub fn event_channel(mut self, channel: Arc<dyn EventChannel>) -> Self {
        self.event_channel = Some(channel);
        self
    }

    /// Cookie jar for the server-to-client token handoff.
    #[must_use]
    pub fn cookie_jar(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Time source for expiry checks. Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Observer of refresh start and end.
    #[must_use]
    pub fn on_auth_refresh(mut self, callback: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_auth_refresh = Some(Arc::new(callback));
        self
    }

    /// Validates the configuration and wires the client.
    ///
    /// The storage-change listener is attached when called inside a tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid configuration or a missing
    /// required component.
    pub fn build(self) -> Result<AuthClient<C, B>, ConfigError> {
        self.config.validate()?;
        let http_client = self
            .http_client
            .ok_or(ConfigError::MissingComponent("http_client"))?;
        let backend = self.backend.ok_or(ConfigError::MissingComponent("backend"))?;
        let durable = self
            .refresh_token_storage
            .ok_or(ConfigError::MissingComponent("refresh_token_storage"))?;
        let ephemeral = self
            .access_token_storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let channel = self
            .event_channel
            .unwrap_or_else(|| Arc::new(LocalEventChannel::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));

        let keys = self.config.storage_keys();
        let notifier = SessionStateNotifier::new(Arc::clone(&durable), channel, &keys);
        let access = AccessTokenStorage::new(ephemeral, &keys);
        let refresh = RefreshTokenStorage::new(durable, &keys, notifier.clone());

        let mut coordinator = RefreshCoordinator::new(
            Arc::clone(&backend),
            access.clone(),
            refresh.clone(),
            notifier.clone(),
            clock,
            self.config.grace(),
        );
        if let Some(callback) = self.on_auth_refresh {
            coordinator = coordinator.with_auth_refresh_callback(callback);
        }

        notifier.listen();
        tracing::debug!(api_url = %self.config.api_url, "auth client ready");

        Ok(AuthClient {
            config: self.config,
            backend,
            access,
            refresh,
            notifier,
            coordinator,
            dispatcher: AuthorizedDispatcher::new(http_client),
            cookie_jar: self.cookie_jar,
        })
    }
}
