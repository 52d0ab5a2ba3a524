//! Interactive authorization-code flow
//!
//! Drives one browser-based PKCE login attempt:
//!
//! ```text
//! Idle → AwaitingRedirect → Exchanging → Completed | Failed
//! ```
//!
//! Each flow owns its own interactive surface and PKCE session — there are
//! no process-wide window or session singletons, so flows can be tested in
//! isolation and safely superseded. The loopback redirect is intercepted by
//! the embedding shell and handed to [`AuthorizationFlow::complete`]; it is
//! never fetched over the network.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::pkce::{PkceSession, build_authorization_url};
use crate::store::TokenStore;
use crate::token::{TokenRecord, exchange_code};

/// The interactive browser window collaborator.
///
/// The embedding shell implements this over whatever window toolkit it
/// uses; the flow only needs to point it at a URL and close it.
pub trait AuthSurface: Send + Sync {
    fn navigate(&self, url: &str);
    fn close(&self);
}

/// Creates one fresh [`AuthSurface`] per login attempt.
pub trait SurfaceProvider: Send + Sync {
    fn create(&self) -> Box<dyn AuthSurface>;
}

/// Authorization flow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingRedirect,
    Exchanging,
    Completed,
    /// Terminal failure, including supersession by a newer flow.
    Failed,
}

/// Authentication state change, broadcast to interested observers.
///
/// The flow runs asynchronously and outlives the call that triggered it,
/// so open screens subscribe rather than re-polling the store.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    Completed,
    Failed(String),
}

/// One interactive login attempt.
pub struct AuthorizationFlow {
    config: AuthConfig,
    http: reqwest::Client,
    store: Arc<TokenStore>,
    surface: Box<dyn AuthSurface>,
    session: Mutex<Option<PkceSession>>,
    state: Mutex<FlowState>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthorizationFlow {
    pub fn new(
        config: AuthConfig,
        http: reqwest::Client,
        store: Arc<TokenStore>,
        surface: Box<dyn AuthSurface>,
        events: broadcast::Sender<AuthEvent>,
    ) -> Self {
        Self {
            config,
            http,
            store,
            surface,
            session: Mutex::new(None),
            state: Mutex::new(FlowState::Idle),
            events,
        }
    }

    pub fn state(&self) -> FlowState {
        *self.state.lock().expect("flow state lock poisoned")
    }

    fn set_state(&self, next: FlowState) {
        *self.state.lock().expect("flow state lock poisoned") = next;
    }

    /// Begin the attempt: generate a fresh PKCE session and navigate the
    /// surface to the authorization URL.
    pub fn start(&self) {
        let session = PkceSession::new();
        let url = build_authorization_url(&self.config, session.challenge());
        *self.session.lock().expect("flow session lock poisoned") = Some(session);
        self.set_state(FlowState::AwaitingRedirect);
        info!("opening interactive authorization surface");
        self.surface.navigate(&url);
    }

    /// Whether `url` is this flow's loopback redirect.
    pub fn matches_redirect(&self, url: &str) -> bool {
        url.starts_with(&self.config.redirect_uri)
    }

    /// Consume the intercepted redirect: close the surface, extract the
    /// authorization code, exchange it for tokens, and persist the record.
    ///
    /// The PKCE session is consumed exactly once; delivering a second
    /// redirect to the same flow is an error.
    pub async fn complete(&self, redirect_url: &str) -> Result<TokenRecord> {
        // Close the surface before anything else so no authentication
        // window is left dangling, success or failure.
        self.surface.close();

        let code = match extract_code(redirect_url) {
            Some(code) => code,
            None => {
                let err = Error::MissingCode(redirect_url.into());
                self.fail(&err);
                return Err(err);
            }
        };

        let session = self
            .session
            .lock()
            .expect("flow session lock poisoned")
            .take()
            .ok_or(Error::SessionConsumed)?;

        self.set_state(FlowState::Exchanging);

        let record = async {
            let response =
                exchange_code(&self.http, &self.config, &code, session.verifier()).await?;
            response.into_record(chrono::Utc::now())
        }
        .await;

        let record = match record {
            Ok(record) => record,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        if let Err(err) = self.store.save(record.clone()).await {
            self.fail(&err);
            return Err(err);
        }

        self.set_state(FlowState::Completed);
        info!(expires_at = %record.expires_at, "interactive login completed");
        let _ = self.events.send(AuthEvent::Completed);
        Ok(record)
    }

    /// Abandon this attempt in favor of a newer one: close the surface and
    /// discard the unconsumed session. A completed flow is left as-is.
    pub fn supersede(&self) {
        self.surface.close();
        self.session
            .lock()
            .expect("flow session lock poisoned")
            .take();
        let mut state = self.state.lock().expect("flow state lock poisoned");
        if *state != FlowState::Completed {
            *state = FlowState::Failed;
        }
    }

    fn fail(&self, err: &Error) {
        warn!(error = %err, "interactive login failed");
        self.set_state(FlowState::Failed);
        let _ = self.events.send(AuthEvent::Failed(err.to_string()));
    }
}

/// Pull the `code` query parameter out of the intercepted redirect URL.
fn extract_code(redirect_url: &str) -> Option<String> {
    let parsed = url::Url::parse(redirect_url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StubSurface {
        navigated: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl AuthSurface for StubSurface {
        fn navigate(&self, url: &str) {
            self.navigated.lock().unwrap().push(url.to_string());
        }
        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct Harness {
        flow: AuthorizationFlow,
        navigated: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
        events: broadcast::Receiver<AuthEvent>,
        store: Arc<TokenStore>,
        _dir: tempfile::TempDir,
    }

    async fn harness(token_url: &str) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            TokenStore::open(dir.path().join("oclc_oauth_token.json"))
                .await
                .unwrap(),
        );
        let navigated = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = broadcast::channel(8);
        let config = AuthConfig {
            token_url: token_url.into(),
            ..AuthConfig::default()
        };
        let flow = AuthorizationFlow::new(
            config,
            reqwest::Client::new(),
            store.clone(),
            Box::new(StubSurface {
                navigated: navigated.clone(),
                closed: closed.clone(),
            }),
            sender,
        );
        Harness {
            flow,
            navigated,
            closed,
            events: receiver,
            store,
            _dir: dir,
        }
    }

    fn token_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "at_flow",
            "refresh_token": "rt_flow",
            "token_type": "bearer",
            "expires_at": "2099-01-01 00:20:00Z",
            "refresh_token_expires_at": "2099-01-15 00:00:00Z",
        })
    }

    #[tokio::test]
    async fn start_navigates_surface_to_authorization_url() {
        let mut h = harness("https://oauth.oclc.org/token").await;
        h.flow.start();

        assert_eq!(h.flow.state(), FlowState::AwaitingRedirect);
        let navigated = h.navigated.lock().unwrap();
        assert_eq!(navigated.len(), 1);
        assert!(navigated[0].contains("response_type=code"));
        assert!(navigated[0].contains("code_challenge_method=S256"));
        assert!(h.events.try_recv().is_err(), "no event before completion");
    }

    #[tokio::test]
    async fn complete_exchanges_code_and_persists_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("grant_type", "authorization_code"))
            .and(query_param("code", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut h = harness(&format!("{}/token", server.uri())).await;
        h.flow.start();

        let record = h
            .flow
            .complete("http://127.0.0.1:9999/oauthcallback/?code=abc123")
            .await
            .unwrap();

        assert_eq!(record.access_token, "at_flow");
        assert_eq!(h.flow.state(), FlowState::Completed);
        assert!(h.closed.load(Ordering::SeqCst), "surface must be closed");
        assert_eq!(h.store.load().await.unwrap().access_token, "at_flow");
        assert!(matches!(h.events.try_recv().unwrap(), AuthEvent::Completed));
    }

    #[tokio::test]
    async fn redirect_without_code_fails_with_surface_closed() {
        let mut h = harness("https://oauth.oclc.org/token").await;
        h.flow.start();

        let err = h
            .flow
            .complete("http://127.0.0.1:9999/oauthcallback/?error=access_denied")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingCode(_)));
        assert_eq!(h.flow.state(), FlowState::Failed);
        assert!(h.closed.load(Ordering::SeqCst), "surface must be closed");
        assert!(h.store.load().await.is_none());
        assert!(matches!(h.events.try_recv().unwrap(), AuthEvent::Failed(_)));
    }

    #[tokio::test]
    async fn failed_exchange_broadcasts_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .expect(1)
            .mount(&server)
            .await;

        let mut h = harness(&format!("{}/token", server.uri())).await;
        h.flow.start();

        let err = h
            .flow
            .complete("http://127.0.0.1:9999/oauthcallback/?code=stale")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Exchange { status: 400, .. }));
        assert_eq!(h.flow.state(), FlowState::Failed);
        assert!(h.store.load().await.is_none());
        assert!(matches!(h.events.try_recv().unwrap(), AuthEvent::Failed(_)));
    }

    #[tokio::test]
    async fn session_is_consumed_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/token", server.uri())).await;
        h.flow.start();

        h.flow
            .complete("http://127.0.0.1:9999/oauthcallback/?code=abc123")
            .await
            .unwrap();

        // A second redirect delivery finds no session left to consume
        let err = h
            .flow
            .complete("http://127.0.0.1:9999/oauthcallback/?code=abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionConsumed));
    }

    #[tokio::test]
    async fn supersede_closes_surface_and_fails_flow() {
        let h = harness("https://oauth.oclc.org/token").await;
        h.flow.start();

        h.flow.supersede();
        assert_eq!(h.flow.state(), FlowState::Failed);
        assert!(h.closed.load(Ordering::SeqCst));

        // The discarded session cannot be consumed afterwards
        let err = h
            .flow
            .complete("http://127.0.0.1:9999/oauthcallback/?code=late")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionConsumed));
    }

    #[test]
    fn matches_redirect_is_a_prefix_match() {
        let config = AuthConfig::default();
        assert!("http://127.0.0.1:9999/oauthcallback/?code=x".starts_with(&config.redirect_uri));
    }

    #[test]
    fn extract_code_reads_query_parameter() {
        assert_eq!(
            extract_code("http://127.0.0.1:9999/oauthcallback/?code=abc&state=s"),
            Some("abc".into())
        );
        assert_eq!(
            extract_code("http://127.0.0.1:9999/oauthcallback/?error=denied"),
            None
        );
        assert_eq!(extract_code("not a url"), None);
    }
}
