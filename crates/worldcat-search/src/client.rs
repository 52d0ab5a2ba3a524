//! Authenticated holdings search client
//!
//! Wraps the Discovery bibs-holdings endpoint with bearer authentication
//! from the token lifecycle manager. Authorization failures (401, or a 403
//! carrying the gateway's explicit-deny message) get exactly one recovery
//! attempt: silently refresh the token and resubmit the identical request
//! once. A second failure of the same kind is surfaced, never retried — the
//! single-retry bound is an explicit invariant here, not interceptor
//! chaining.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, warn};

use worldcat_auth::TokenLifecycleManager;

use crate::error::{Error, Result};
use crate::query::HoldingsQuery;
use crate::records::BriefRecord;

/// Discovery API base for the Americas data center.
pub const DISCOVERY_BASE_URL: &str = "https://americas.discovery.api.oclc.org/worldcat/search/v2";

/// The 403 body message that means "token no longer authorized" rather than
/// a plain permission problem. Matched verbatim; any other 403 is final.
const EXPLICIT_DENY_MESSAGE: &str =
    "User is not authorized to access this resource with an explicit deny";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchResponse {
    number_of_records: u64,
    brief_records: Vec<BriefRecord>,
}

/// Client for the bibs-holdings search endpoint.
pub struct HoldingsClient {
    lifecycle: Arc<TokenLifecycleManager>,
    http: reqwest::Client,
    base_url: String,
}

impl HoldingsClient {
    pub fn new(lifecycle: Arc<TokenLifecycleManager>, http: reqwest::Client) -> Self {
        Self::with_base_url(lifecycle, http, DISCOVERY_BASE_URL)
    }

    /// Create a client against a non-default base URL (other data centers,
    /// tests).
    pub fn with_base_url(
        lifecycle: Arc<TokenLifecycleManager>,
        http: reqwest::Client,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            lifecycle,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Search for bibliographic holdings.
    ///
    /// `correlation_id` (e.g. a spreadsheet row's MMS id) is attached to
    /// every returned record so batch callers can map results back to
    /// their input rows.
    pub async fn search(
        &self,
        query: &HoldingsQuery,
        correlation_id: Option<&str>,
    ) -> Result<Vec<BriefRecord>> {
        let token = self
            .lifecycle
            .get_token(true)
            .await
            .ok_or(Error::NotAuthenticated)?;

        let url = format!("{}/bibs-holdings", self.base_url);
        let params = query.to_params();
        debug!(search_type = %query.search_type(), number = query.search_number(), "searching holdings");

        let (status, body) = self.send(&url, &params, &token.access_token).await?;

        if is_auth_denied(status, &body) {
            debug!(status = status.as_u16(), "authorization failure, refreshing token for one retry");
            return self.retry_once(&url, &params, status, body, correlation_id).await;
        }

        finish(status, &body, correlation_id)
    }

    /// The single recovery attempt: refresh the token without interactive
    /// login and resubmit the identical request once. Refresh failures
    /// surface the original authorization error.
    async fn retry_once(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        first_status: StatusCode,
        first_body: String,
        correlation_id: Option<&str>,
    ) -> Result<Vec<BriefRecord>> {
        if self.lifecycle.get_token(false).await.is_none() {
            return Err(search_error(first_status, &first_body));
        }

        let refreshed = match self.lifecycle.force_refresh().await {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "token refresh during retry failed");
                return Err(search_error(first_status, &first_body));
            }
        };

        let (status, body) = self.send(url, params, &refreshed.access_token).await?;
        finish(status, &body, correlation_id)
    }

    async fn send(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        bearer: &str,
    ) -> Result<(StatusCode, String)> {
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .header(ACCEPT, "application/json")
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        Ok((status, body))
    }
}

/// Map a response that has exhausted recovery into the final result.
fn finish(status: StatusCode, body: &str, correlation_id: Option<&str>) -> Result<Vec<BriefRecord>> {
    if !status.is_success() {
        return Err(search_error(status, body));
    }

    let response: SearchResponse = serde_json::from_str(body).map_err(|e| Error::Search {
        status: None,
        message: format!("invalid search response: {e}"),
    })?;

    if response.number_of_records == 0 {
        return Ok(Vec::new());
    }

    let mms_id = correlation_id.unwrap_or_default();
    Ok(response
        .brief_records
        .into_iter()
        .map(|mut record| {
            record.mms_id = mms_id.to_string();
            record
        })
        .collect())
}

/// Whether this response is the authorization-expiry class that earns the
/// one recovery attempt: a 401, or a 403 whose body carries the explicit
/// deny message.
fn is_auth_denied(status: StatusCode, body: &str) -> bool {
    match status {
        StatusCode::UNAUTHORIZED => true,
        StatusCode::FORBIDDEN => {
            serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("Message").and_then(|m| m.as_str().map(String::from)))
                .is_some_and(|message| message == EXPLICIT_DENY_MESSAGE)
        }
        _ => false,
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        format!("request failed: {err}")
    };
    Error::Search {
        status: None,
        message,
    }
}

/// Extract the human-readable detail from an upstream error body, checked
/// in priority order: `detail`, `Message`, `message`, else the raw body.
fn search_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["detail", "Message", "message"]
                .iter()
                .find_map(|key| v.get(key).and_then(|m| m.as_str()).map(String::from))
        })
        .unwrap_or_else(|| body.to_string());

    Error::Search {
        status: Some(status.as_u16()),
        message,
    }
}
