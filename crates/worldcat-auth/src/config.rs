//! Authentication configuration
//!
//! Config precedence: env vars > config file > compiled-in defaults.
//! All defaults come from `constants` and describe the public OCLC client;
//! a config file is only needed to point the client at another institution
//! or (in tests) at a mock server.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    APP_CLIENT_WSKEY, AUTHORIZE_ENDPOINT, DEFAULT_HTTP_TIMEOUT_SECS, REDIRECT_URI, SCOPES,
    TOKEN_ENDPOINT,
};

/// OAuth client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Authorization endpoint, browser-navigated
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    /// Token endpoint for code exchange and refresh
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Public client WSKey
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Fixed loopback redirect, intercepted client-side
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Space-separated OAuth scopes
    #[serde(default = "default_scopes")]
    pub scopes: String,
    /// Timeout for token and search HTTP calls, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_authorize_url() -> String {
    AUTHORIZE_ENDPOINT.into()
}

fn default_token_url() -> String {
    TOKEN_ENDPOINT.into()
}

fn default_client_id() -> String {
    APP_CLIENT_WSKEY.into()
}

fn default_redirect_uri() -> String {
    REDIRECT_URI.into()
}

fn default_scopes() -> String {
    SCOPES.into()
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// The `WORLDCAT_WSKEY` env var overrides the client_id from the file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: AuthConfig = toml::from_str(&contents)?;

        if let Ok(wskey) = std::env::var("WORLDCAT_WSKEY") {
            let wskey = wskey.trim().to_owned();
            if !wskey.is_empty() {
                config.client_id = wskey;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate endpoint URLs and required fields.
    pub fn validate(&self) -> common::Result<()> {
        for (name, value) in [
            ("authorize_url", &self.authorize_url),
            ("token_url", &self.token_url),
            ("redirect_uri", &self.redirect_uri),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {value}"
                )));
            }
        }

        if self.client_id.is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        if self.scopes.is_empty() {
            return Err(common::Error::Config("scopes must not be empty".into()));
        }

        if self.http_timeout_secs == 0 {
            return Err(common::Error::Config(
                "http_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Build an HTTP client with this config's request timeout applied.
    ///
    /// Used for token and search calls; the interactive browser surface is
    /// not subject to this timeout.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
    }
}
