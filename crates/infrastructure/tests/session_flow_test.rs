//! Integration tests for the adapters wired into an `AuthClient`.
//!
//! A fake GraphQL server stands in for the network; storage is a real JSON
//! file in a temporary directory, shared between "processes" the way two
//! clients on one machine would share it.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use fylinde_auth_application::auth::LocalEventChannel;
use fylinde_auth_application::ports::{HttpClient, HttpClientError, StorageRepository};
use fylinde_auth_application::{AuthClient, AuthClientConfig, RefreshState};
use fylinde_auth_domain::request::AUTHORIZATION;
use fylinde_auth_domain::{
    AuthChannelEvent, AuthRequest, FetchOptions, HttpResponse, SessionState, TokenCreateVariables,
};
use fylinde_auth_infrastructure::{GraphqlAuthBackend, JsonFileStorage, MemoryCookieJar};

const API_URL: &str = "http://a/graphql/";

fn jwt(expires_in_secs: i64) -> String {
    let payload = serde_json::json!({
        "iss": API_URL,
        "exp": Utc::now().timestamp() + expires_in_secs,
        "type": "access",
    });
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

/// Answers the credential mutations and records everything else.
struct FakeGraphqlServer {
    access_ttl_secs: i64,
    refresh_calls: AtomicUsize,
    api_authorizations: Mutex<Vec<Option<String>>>,
}

impl FakeGraphqlServer {
    fn new(access_ttl_secs: i64) -> Arc<Self> {
        Arc::new(Self {
            access_ttl_secs,
            refresh_calls: AtomicUsize::new(0),
            api_authorizations: Mutex::new(Vec::new()),
        })
    }
}

impl HttpClient for FakeGraphqlServer {
    async fn execute(&self, request: &AuthRequest) -> Result<HttpResponse, HttpClientError> {
        let query = request
            .body
            .as_deref()
            .and_then(|body| serde_json::from_str::<serde_json::Value>(body).ok())
            .and_then(|body| body["query"].as_str().map(String::from))
            .unwrap_or_default();

        let body = if query.contains("tokenCreate(") {
            serde_json::json!({"data": {"tokenCreate": {
                "token": jwt(self.access_ttl_secs),
                "refreshToken": "refresh-1",
                "errors": [],
            }}})
        } else if query.contains("tokenRefresh(") {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            serde_json::json!({"data": {"tokenRefresh": {
                "token": jwt(3600),
                "errors": [],
            }}})
        } else {
            self.api_authorizations
                .lock()
                .push(request.headers.get(AUTHORIZATION).map(String::from));
            serde_json::json!({"data": {"me": {"email": "admin@example.com"}}})
        };
        Ok(HttpResponse::new(200, body.to_string()))
    }
}

fn client(
    server: &Arc<FakeGraphqlServer>,
    storage: Arc<JsonFileStorage>,
    channel: Arc<LocalEventChannel>,
) -> AuthClient<FakeGraphqlServer, GraphqlAuthBackend<FakeGraphqlServer>> {
    let config = AuthClientConfig::new(API_URL);
    AuthClient::builder(config.clone())
        .http_client(server.clone())
        .backend(Arc::new(GraphqlAuthBackend::new(server.clone(), &config)))
        .refresh_token_storage(storage)
        .event_channel(channel)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_sign_in_then_authenticated_request() {
    let dir = tempdir().unwrap();
    let storage = Arc::new(JsonFileStorage::open(dir.path().join("session.json")).unwrap());
    let server = FakeGraphqlServer::new(3600);
    let client = client(&server, storage.clone(), Arc::new(LocalEventChannel::new()));

    client
        .sign_in(&TokenCreateVariables::new("admin@example.com", "admin"))
        .await
        .unwrap();
    client
        .fetch_with_auth(
            AuthRequest::post(API_URL, r#"{"query":"{ me { email } }"}"#),
            FetchOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(client.session_state(), SessionState::SignedIn);
    let authorizations = server.api_authorizations.lock().clone();
    assert_eq!(authorizations.len(), 1);
    assert!(authorizations[0].as_deref().unwrap().starts_with("Bearer "));

    let reopened = JsonFileStorage::open(storage.path()).unwrap();
    let keys = AuthClientConfig::new(API_URL).storage_keys();
    assert_eq!(reopened.get_item(&keys.refresh_token).as_deref(), Some("refresh-1"));
    assert_eq!(reopened.get_item(&keys.auth_state).as_deref(), Some("signedIn"));
    assert_eq!(reopened.get_item(&keys.access_token), None);
}

#[tokio::test]
async fn test_new_process_refreshes_from_persisted_token() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let server = FakeGraphqlServer::new(3600);

    let first = client(
        &server,
        Arc::new(JsonFileStorage::open(&path).unwrap()),
        Arc::new(LocalEventChannel::new()),
    );
    first
        .sign_in(&TokenCreateVariables::new("admin@example.com", "admin"))
        .await
        .unwrap();
    drop(first);

    let second = client(
        &server,
        Arc::new(JsonFileStorage::open(&path).unwrap()),
        Arc::new(LocalEventChannel::new()),
    );
    assert_eq!(second.refresh_state(), RefreshState::ExpiredWithRefresh);

    let requests = (0..3).map(|_| {
        second.fetch_with_auth(
            AuthRequest::post(API_URL, r#"{"query":"{ me { email } }"}"#),
            FetchOptions::default(),
        )
    });
    for response in futures::future::join_all(requests).await {
        response.unwrap();
    }

    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    assert!(
        server
            .api_authorizations
            .lock()
            .iter()
            .all(|authorization| authorization.is_some())
    );
    assert_eq!(second.refresh_state(), RefreshState::Valid);
}

#[tokio::test]
async fn test_sign_out_in_other_process_is_observed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let server = FakeGraphqlServer::new(3600);

    let ours_storage = Arc::new(JsonFileStorage::open(&path).unwrap());
    let ours_channel = Arc::new(LocalEventChannel::new());
    let ours = client(&server, ours_storage.clone(), ours_channel.clone());
    ours.sign_in(&TokenCreateVariables::new("admin@example.com", "admin"))
        .await
        .unwrap();
    let mut events = ours.subscribe_auth_state();

    let theirs = client(
        &server,
        Arc::new(JsonFileStorage::open(&path).unwrap()),
        Arc::new(LocalEventChannel::new()),
    );
    theirs.sign_out();

    let published = ours_storage
        .sync_external_changes(ours_channel.as_ref())
        .unwrap();
    assert_eq!(published, 2);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event,
        AuthChannelEvent::AuthStateChanged {
            auth_state: SessionState::SignedOut
        }
    );
    assert_eq!(ours.session_state(), SessionState::SignedOut);
}

#[tokio::test]
async fn test_cookie_handoff_from_server_render() {
    let dir = tempdir().unwrap();
    let server = FakeGraphqlServer::new(3600);
    let token = jwt(3600);
    let jar = Arc::new(MemoryCookieJar::from_cookie_header(&format!(
        "theme=dark; token={token}"
    )));
    let config = AuthClientConfig::new(API_URL);
    let client = AuthClient::builder(config.clone())
        .http_client(server.clone())
        .backend(Arc::new(GraphqlAuthBackend::new(server.clone(), &config)))
        .refresh_token_storage(Arc::new(
            JsonFileStorage::open(dir.path().join("session.json")).unwrap(),
        ))
        .cookie_jar(jar.clone())
        .build()
        .unwrap();

    client
        .fetch_with_auth(AuthRequest::get(API_URL), FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(
        server.api_authorizations.lock().clone(),
        vec![Some(format!("Bearer {token}"))]
    );
    assert_eq!(jar.set_cookie_headers().len(), 1);
}

