//! Final hop of an authenticated call.

use std::sync::Arc;

use fylinde_auth_domain::{AuthRequest, FetchOptions, Header, HttpResponse, decode_issuer};

use super::coordinator::Authorization;
use crate::ports::{HttpClient, HttpClientError};

/// Attaches the bearer credential where the token's issuer allows it, then
/// hands the request to the transport.
pub struct AuthorizedDispatcher<C> {
    http_client: Arc<C>,
}

impl<C> Clone for AuthorizedDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            http_client: Arc::clone(&self.http_client),
        }
    }
}

impl<C: HttpClient> AuthorizedDispatcher<C> {
    /// Creates a dispatcher over the given transport.
    #[must_use]
    pub const fn new(http_client: Arc<C>) -> Self {
        Self { http_client }
    }

    /// Sends `request` with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns the transport's error; credential decisions never fail.
    pub async fn dispatch(
        &self,
        request: AuthRequest,
        authorization: &Authorization,
        options: FetchOptions,
    ) -> Result<HttpResponse, HttpClientError> {
        let request = match authorization {
            Authorization::Bearer(token) => decorate(request, token, options),
            Authorization::Anonymous => request,
        };
        self.http_client.execute(&request).await
    }
}

/// Adds `Authorization: Bearer <token>` when the token's issuer equals the
/// request URL exactly, or when third-party domains are explicitly allowed.
#[must_use]
pub fn decorate(request: AuthRequest, token: &str, options: FetchOptions) -> AuthRequest {
    let issuer_matches = decode_issuer(token).is_ok_and(|issuer| issuer == request.url);
    let allowed = issuer_matches || options.allow_passing_token_to_third_party_domains;

    if !issuer_matches {
        if allowed {
            tracing::warn!(
                url = %request.url,
                "token issuer and request URL do not match but passing the token to third-party domains was allowed"
            );
        } else {
            tracing::warn!(
                url = %request.url,
                "token issuer and request URL do not match, not adding Authorization header"
            );
        }
    }

    if allowed {
        request.with_header(Header::bearer(token))
    } else {
        request
    }
}
