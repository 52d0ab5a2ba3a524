//! Token lifecycle management
//!
//! The central "do we have a usable token" decision logic. Reads the stored
//! record, refreshes it silently while the refresh token is still valid, and
//! starts a fresh interactive login when nothing else recovers access.
//!
//! Callers treat "no token" as a normal, recoverable condition: refresh
//! failures are logged and converted to an absent result here, never thrown
//! past this boundary. Concurrent callers may race to refresh; the redundant
//! exchanges are tolerated (last write wins) rather than serialized.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::flow::{AuthEvent, AuthorizationFlow, SurfaceProvider};
use crate::store::TokenStore;
use crate::token::{self, TokenRecord};

/// Governs token state for one installation.
///
/// At most one interactive [`AuthorizationFlow`] is active at a time;
/// starting a new one supersedes (destroys) the prior attempt's surface.
pub struct TokenLifecycleManager {
    config: AuthConfig,
    http: reqwest::Client,
    store: Arc<TokenStore>,
    surfaces: Arc<dyn SurfaceProvider>,
    active_flow: Mutex<Option<Arc<AuthorizationFlow>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl TokenLifecycleManager {
    pub fn new(
        config: AuthConfig,
        http: reqwest::Client,
        store: Arc<TokenStore>,
        surfaces: Arc<dyn SurfaceProvider>,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            config,
            http,
            store,
            surfaces,
            active_flow: Mutex::new(None),
            events,
        }
    }

    /// Subscribe to authentication state changes (flow completion/failure).
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Start a fresh interactive login, superseding any active attempt.
    ///
    /// Returns immediately; the flow completes later when the shell hands
    /// the intercepted redirect to [`Self::handle_redirect`].
    pub fn login(&self) -> Arc<AuthorizationFlow> {
        let mut active = self.active_flow.lock().expect("flow slot lock poisoned");
        if let Some(prior) = active.take() {
            debug!("superseding active authorization flow");
            prior.supersede();
        }
        let flow = Arc::new(AuthorizationFlow::new(
            self.config.clone(),
            self.http.clone(),
            self.store.clone(),
            self.surfaces.create(),
            self.events.clone(),
        ));
        flow.start();
        *active = Some(Arc::clone(&flow));
        flow
    }

    /// Route an intercepted navigation to the active flow.
    ///
    /// Returns `Ok(true)` when the URL matched the flow's redirect prefix
    /// and was consumed, `Ok(false)` when no active flow claimed it. The
    /// redirect URL itself is never fetched over the network.
    pub async fn handle_redirect(&self, url: &str) -> Result<bool> {
        let flow = {
            let active = self.active_flow.lock().expect("flow slot lock poisoned");
            active.clone()
        };
        match flow {
            Some(flow) if flow.matches_redirect(url) => {
                flow.complete(url).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Get a usable token, if one can be had without user interaction.
    ///
    /// Decision procedure:
    /// 1. Nothing stored: start an interactive login when `allow_login`,
    ///    then return whatever is currently stored — usually still `None`,
    ///    since the flow completes asynchronously. Callers must tolerate a
    ///    `None` result as "login pending" and re-check on [`AuthEvent`].
    /// 2. Access token still valid: return it, no network call.
    /// 3. Refresh token still valid: one silent refresh exchange. Failure
    ///    is logged and yields `None` — the caller decides whether to
    ///    escalate to an interactive login.
    /// 4. Both expired: as step 1.
    pub async fn get_token(&self, allow_login: bool) -> Option<TokenRecord> {
        let now = Utc::now();
        match self.store.load().await {
            None => self.token_after_login(allow_login).await,
            Some(record) if record.is_access_valid(now) => Some(record),
            Some(record) if record.is_refresh_valid(now) => {
                match self.refresh_and_store(&record.refresh_token).await {
                    Ok(refreshed) => Some(refreshed),
                    Err(err) => {
                        warn!(error = %err, "silent token refresh failed");
                        None
                    }
                }
            }
            Some(_) => self.token_after_login(allow_login).await,
        }
    }

    /// True iff [`Self::get_token`] yields a record.
    pub async fn is_logged_in(&self, allow_login: bool) -> bool {
        self.get_token(allow_login).await.is_some()
    }

    /// Unconditionally refresh the stored record, regardless of expiry.
    ///
    /// Used by the search client's 401-recovery path. Unlike
    /// [`Self::get_token`], errors propagate to the caller.
    pub async fn force_refresh(&self) -> Result<TokenRecord> {
        let record = self
            .store
            .load()
            .await
            .ok_or_else(|| Error::InvalidCredentials("no stored token to refresh".into()))?;
        self.refresh_and_store(&record.refresh_token).await
    }

    /// Explicit logout: drop the stored record.
    pub async fn logout(&self) -> Result<()> {
        info!("logging out, clearing stored token");
        self.store.clear().await
    }

    async fn token_after_login(&self, allow_login: bool) -> Option<TokenRecord> {
        if !allow_login {
            return None;
        }
        self.login();
        // The flow has only just opened its surface; this re-read almost
        // always yields None and the caller waits for an AuthEvent.
        self.store.load().await
    }

    async fn refresh_and_store(&self, refresh: &str) -> Result<TokenRecord> {
        let response = token::refresh_token(&self.http, &self.config, refresh).await?;
        let record = response.into_record(Utc::now())?;
        self.store.save(record.clone()).await?;
        debug!(expires_at = %record.expires_at, "token refreshed");
        Ok(record)
    }
}
