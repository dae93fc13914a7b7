//! Refresh coordination.
//!
//! Every authenticated call asks the coordinator for an [`Authorization`].
//! A valid access token is returned as-is; an expired or missing one is
//! replaced through the refresh exchange when a refresh token exists. At most
//! one exchange is in flight per client: callers arriving while it runs join
//! the same shared operation and observe the same outcome.
//!
//! Sign-in and sign-out run through [`RefreshCoordinator::change_session`].
//! A refresh that started before such a change discards its result instead
//! of writing it over the new session.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use fylinde_auth_domain::{SessionState, is_expired, token_preview};
use parking_lot::Mutex;

use super::notifier::SessionStateNotifier;
use super::token_store::{AccessTokenStorage, RefreshTokenStorage};
use crate::ports::{AuthBackend, Clock};

/// Observer told when a refresh starts (`true`) and when the caller is done
/// waiting for it (`false`).
pub type AuthRefreshCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Classification of the stored credentials for the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// Neither an access token nor a refresh token is stored.
    NoToken,
    /// The access token is present and outside the grace window.
    Valid,
    /// The access token is missing or expired and nothing can renew it.
    ExpiredNoRefresh,
    /// The access token is missing or expired; a refresh would start.
    ExpiredWithRefresh,
    /// The access token is missing or expired; a refresh is already running.
    RefreshInFlight,
}

impl RefreshState {
    /// Returns true if a call in this state will wait on a refresh.
    #[must_use]
    pub const fn needs_refresh(self) -> bool {
        matches!(self, Self::ExpiredWithRefresh | Self::RefreshInFlight)
    }
}

/// Credentials to attach to a request.
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Send the request without credentials.
    Anonymous,
    /// Send the request with this access token.
    Bearer(String),
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Bearer(token) => f.debug_tuple("Bearer").field(&token_preview(token)).finish(),
        }
    }
}

/// Result of one refresh exchange, shared by every caller that awaited it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The backend issued a new access token.
    Refreshed(String),
    /// The backend rejected the refresh token; credentials were cleared.
    Rejected,
    /// The exchange failed before the backend answered; credentials were kept.
    Failed(String),
    /// The session was signed out or replaced while the exchange ran; its
    /// result was discarded and storage left as the new session wrote it.
    Superseded,
}

type RefreshHandle = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Default)]
struct SlotState {
    generation: u64,
    active: Option<RefreshHandle>,
}

/// Holds either nothing or the one active refresh.
#[derive(Default)]
struct RefreshSlot {
    state: Mutex<SlotState>,
}

impl RefreshSlot {
    /// Joins the active refresh or installs a new one, in a single step.
    /// Returns the handle and whether it was started by this call.
    fn join_or_start(
        &self,
        start: impl FnOnce(u64) -> BoxFuture<'static, RefreshOutcome>,
    ) -> (RefreshHandle, bool) {
        let mut state = self.state.lock();
        if let Some(active) = &state.active {
            return (active.clone(), false);
        }
        state.generation += 1;
        let handle = start(state.generation).shared();
        state.active = Some(handle.clone());
        (handle, true)
    }

    /// Empties the slot if it still holds the refresh of `generation`.
    fn release(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation == generation {
            state.active = None;
        }
    }

    fn is_occupied(&self) -> bool {
        self.state.lock().active.is_some()
    }
}

/// Decides per call whether to attach, refresh, or pass through.
pub struct RefreshCoordinator<B> {
    backend: Arc<B>,
    access: AccessTokenStorage,
    refresh: RefreshTokenStorage,
    notifier: SessionStateNotifier,
    clock: Arc<dyn Clock>,
    grace: Duration,
    slot: Arc<RefreshSlot>,
    session_epoch: Arc<Mutex<u64>>,
    on_auth_refresh: Option<AuthRefreshCallback>,
}

impl<B: AuthBackend> RefreshCoordinator<B> {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        access: AccessTokenStorage,
        refresh: RefreshTokenStorage,
        notifier: SessionStateNotifier,
        clock: Arc<dyn Clock>,
        grace: Duration,
    ) -> Self {
        Self {
            backend,
            access,
            refresh,
            notifier,
            clock,
            grace,
            slot: Arc::new(RefreshSlot::default()),
            session_epoch: Arc::new(Mutex::new(0)),
            on_auth_refresh: None,
        }
    }

    /// Registers the refresh observer.
    #[must_use]
    pub fn with_auth_refresh_callback(mut self, callback: AuthRefreshCallback) -> Self {
        self.on_auth_refresh = Some(callback);
        self
    }

    /// Classifies the stored credentials without side effects.
    #[must_use]
    pub fn classify(&self) -> RefreshState {
        let access_token = self.access.get_access_token();
        if access_token.as_deref().is_some_and(|token| !self.is_expired(token)) {
            return RefreshState::Valid;
        }
        match (access_token, self.refresh.get_refresh_token()) {
            (None, None) => RefreshState::NoToken,
            (Some(_), None) => RefreshState::ExpiredNoRefresh,
            (_, Some(_)) if self.slot.is_occupied() => RefreshState::RefreshInFlight,
            (_, Some(_)) => RefreshState::ExpiredWithRefresh,
        }
    }

    /// Returns true while a refresh exchange is outstanding.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.slot.is_occupied()
    }

    /// Runs `change` as a new session. Refreshes started before it will not
    /// apply their outcome, and none can apply one while `change` runs.
    pub fn change_session<R>(&self, change: impl FnOnce() -> R) -> R {
        let mut epoch = self.session_epoch.lock();
        *epoch += 1;
        tracing::debug!(epoch = *epoch, "session changed");
        change()
    }

    /// Resolves the credentials for one call, refreshing if needed.
    ///
    /// Never fails: a missing or rejected credential degrades to
    /// [`Authorization::Anonymous`].
    pub async fn authorize(&self) -> Authorization {
        if let Some(token) = self.valid_access_token() {
            return Authorization::Bearer(token);
        }

        let Some(refresh_token) = self.refresh.get_refresh_token() else {
            tracing::debug!("no usable access token and no refresh token, passing through");
            return Authorization::Anonymous;
        };

        self.notify_auth_refresh(true);
        let outcome = self.join_or_start(refresh_token).await;
        self.notify_auth_refresh(false);

        match outcome {
            RefreshOutcome::Refreshed(token) => Authorization::Bearer(token),
            RefreshOutcome::Superseded => self
                .valid_access_token()
                .map_or(Authorization::Anonymous, Authorization::Bearer),
            RefreshOutcome::Rejected | RefreshOutcome::Failed(_) => Authorization::Anonymous,
        }
    }

    /// Forces a refresh with the stored refresh token, joining one already
    /// in flight. Returns `None` when no refresh token is stored.
    pub async fn refresh(&self) -> Option<RefreshOutcome> {
        let refresh_token = self.refresh.get_refresh_token()?;
        Some(self.join_or_start(refresh_token).await)
    }

    fn join_or_start(&self, refresh_token: String) -> RefreshHandle {
        let (handle, started) = self
            .slot
            .join_or_start(|generation| self.refresh_operation(refresh_token, generation));
        if started {
            tracing::debug!("token refresh started");
        } else {
            tracing::debug!("joining in-flight token refresh");
        }
        handle
    }

    /// Builds the shared refresh. Storing the outcome and releasing the slot
    /// happen inside it, so they run once however many callers await it.
    ///
    /// The outcome is stored only if no session change happened and the
    /// refresh token used is still the stored one. Both are checked under
    /// the session lock.
    fn refresh_operation(
        &self,
        refresh_token: String,
        generation: u64,
    ) -> BoxFuture<'static, RefreshOutcome> {
        let backend = Arc::clone(&self.backend);
        let access = self.access.clone();
        let refresh = self.refresh.clone();
        let notifier = self.notifier.clone();
        let slot = Arc::clone(&self.slot);
        let session_epoch = Arc::clone(&self.session_epoch);
        let started_in = *session_epoch.lock();

        async move {
            let result = backend.token_refresh(&refresh_token).await;
            let epoch = session_epoch.lock();
            let current = *epoch == started_in
                && refresh.get_refresh_token().as_deref() == Some(refresh_token.as_str());
            let outcome = match result {
                _ if !current => {
                    tracing::info!("session changed during token refresh, result discarded");
                    RefreshOutcome::Superseded
                }
                Ok(response) => match response.refreshed_token() {
                    Some(token) => {
                        access.set_access_token(token);
                        notifier.set_state(SessionState::SignedIn);
                        tracing::debug!(token = %token_preview(token), "access token refreshed");
                        RefreshOutcome::Refreshed(token.to_string())
                    }
                    None => {
                        access.clear_auth_storage();
                        refresh.clear_auth_storage();
                        tracing::warn!("token refresh rejected, session cleared");
                        RefreshOutcome::Rejected
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "token refresh failed, keeping credentials");
                    RefreshOutcome::Failed(e.to_string())
                }
            };
            drop(epoch);
            slot.release(generation);
            outcome
        }
        .boxed()
    }

    fn valid_access_token(&self) -> Option<String> {
        self.access
            .get_access_token()
            .filter(|token| !self.is_expired(token))
    }

    fn is_expired(&self, token: &str) -> bool {
        is_expired(token, self.grace, self.clock.now())
    }

    fn notify_auth_refresh(&self, is_authenticating: bool) {
        if let Some(callback) = &self.on_auth_refresh {
            callback(is_authenticating);
        }
    }
}
