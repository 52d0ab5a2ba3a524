//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (initial OAuth flow completion)
//! 2. Token refresh (silent refresh around API calls)
//!
//! Both operations POST to the configured token endpoint with different
//! grant types. The OCLC endpoint reads the grant parameters from the query
//! string and returns absolute expiry timestamps in the
//! `"2013-08-23 18:45:29Z"` format alongside the usual `expires_in` delta.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// Serde adapter for the OCLC timestamp format `"%Y-%m-%d %H:%M:%SZ"`.
pub(crate) mod oclc_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, FORMAT).map(|naive| naive.and_utc())
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => super::serialize(dt, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            raw.map(|r| parse(&r).map_err(de::Error::custom)).transpose()
        }
    }
}

fn default_token_type() -> String {
    "bearer".into()
}

/// Response from the token endpoint for both exchange and refresh.
///
/// Expiry arrives either as absolute `expires_at` / `refresh_token_expires_at`
/// timestamps or as `expires_in` / `refresh_token_expires_in` second deltas;
/// [`TokenResponse::into_record`] resolves whichever is present into the
/// absolute timestamps the stored [`TokenRecord`] carries. The remaining
/// fields are opaque passthrough metadata preserved verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default, with = "oclc_datetime::option")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
    #[serde(default, with = "oclc_datetime::option")]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: String,
    #[serde(rename = "principalID", default)]
    pub principal_id: String,
    #[serde(rename = "principalIDNS", default)]
    pub principal_idns: String,
    #[serde(rename = "contextInstitutionId", default)]
    pub context_institution_id: String,
}

impl TokenResponse {
    /// Resolve this wire response into the persisted record form.
    ///
    /// Absolute timestamps win over second deltas when both are present.
    /// A response with no access-token expiry at all is a parse error; a
    /// missing refresh expiry falls back to the access expiry, which makes
    /// refresh impossible once the access token lapses (accepted per the
    /// data-model invariants).
    pub fn into_record(self, now: DateTime<Utc>) -> Result<TokenRecord> {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)))
            .ok_or_else(|| {
                Error::Parse("token response carries neither expires_at nor expires_in".into())
            })?;
        let refresh_token_expires_at = self
            .refresh_token_expires_at
            .or_else(|| {
                self.refresh_token_expires_in
                    .map(|secs| now + Duration::seconds(secs))
            })
            .unwrap_or(expires_at);

        Ok(TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at,
            refresh_token_expires_at,
            scopes: self.scopes,
            principal_id: self.principal_id,
            principal_idns: self.principal_idns,
            context_institution_id: self.context_institution_id,
        })
    }
}

/// The single persisted token record.
///
/// Immutable once obtained — every successful exchange or refresh replaces
/// it wholesale, the store never partially updates it. Absence from the
/// store means "not authenticated".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    #[serde(with = "oclc_datetime")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "oclc_datetime")]
    pub refresh_token_expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: String,
    #[serde(rename = "principalID", default)]
    pub principal_id: String,
    #[serde(rename = "principalIDNS", default)]
    pub principal_idns: String,
    #[serde(rename = "contextInstitutionId", default)]
    pub context_institution_id: String,
}

impl TokenRecord {
    /// Whether the access token is still usable at `now`.
    pub fn is_access_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whether the refresh token can still mint a new access token at `now`.
    pub fn is_refresh_valid(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token_expires_at > now
    }
}

/// Exchange an authorization code for tokens (initial OAuth flow).
///
/// This is the second step of the PKCE flow: the user has authorized in the
/// browser surface, and the redirect carried the authorization code. We send
/// the code along with the PKCE verifier to prove we initiated the flow.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &AuthConfig,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(&config.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .query(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &config.client_id),
            ("redirect_uri", &config.redirect_uri),
            ("code_verifier", verifier),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Exchange {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::Parse(format!("invalid token response: {e}")))
}

/// Refresh an access token using a refresh token.
///
/// Called silently by the lifecycle manager when the access token has
/// expired but the refresh token has not.
pub async fn refresh_token(
    client: &reqwest::Client,
    config: &AuthConfig,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(&config.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .query(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", &config.client_id),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 401/403 means the refresh token is revoked or invalid
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::Exchange {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::Parse(format!("invalid refresh response: {e}")))
}
