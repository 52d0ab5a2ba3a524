//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the code verifier and S256 challenge used during the OAuth
//! authorization flow. The verifier is held in memory for the lifetime of
//! one login attempt and sent during token exchange; the challenge is
//! included in the authorization URL so the authorization server can verify
//! the exchange request came from the same party that initiated the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use common::Secret;
use rand::RngExt;
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;

/// Bytes of entropy in the code verifier. Rendered as hex, so the verifier
/// string is twice this length — 56 characters, within the 43-128 range
/// RFC 7636 requires.
const VERIFIER_ENTROPY_BYTES: usize = 28;

/// Generate a cryptographically random PKCE code verifier.
///
/// Produces 28 CSPRNG bytes hex-encoded to a 56-character string.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, padding stripped.
///
/// Deterministic given the same verifier — the authorization server
/// recomputes it from the verifier sent at token-exchange time.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Build the full authorization URL with all required OAuth parameters.
pub fn build_authorization_url(config: &AuthConfig, challenge: &str) -> String {
    format!(
        "{}?response_type=code&scope={}&redirect_uri={}&client_id={}&code_challenge={}&code_challenge_method=S256",
        config.authorize_url,
        urlencoded(&config.scopes),
        urlencoded(&config.redirect_uri),
        config.client_id,
        challenge,
    )
}

/// Minimal URL encoding for parameter values.
/// Only encodes characters that would break URL parameter parsing.
fn urlencoded(s: &str) -> String {
    s.replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
}

/// One interactive login attempt's PKCE state.
///
/// Created when the login starts, consumed exactly once at code-exchange
/// time, never persisted and never reused across attempts. The verifier is
/// wrapped in [`Secret`] so it cannot leak through Debug output or logs.
pub struct PkceSession {
    verifier: Secret<String>,
    challenge: String,
}

impl PkceSession {
    pub fn new() -> Self {
        let verifier = generate_verifier();
        let challenge = compute_challenge(&verifier);
        Self {
            verifier: Secret::new(verifier),
            challenge,
        }
    }

    /// The S256 challenge to place in the authorization URL.
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// The verifier to send with the token exchange.
    pub fn verifier(&self) -> &str {
        self.verifier.expose()
    }
}

impl Default for PkceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PkceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceSession")
            .field("verifier", &self.verifier)
            .field("challenge", &self.challenge)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_is_fixed_length_hex() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), 56);
        assert!(
            verifier.chars().all(|c| c.is_ascii_hexdigit()),
            "verifier must be lowercase hex: {verifier}"
        );
    }

    #[test]
    fn verifiers_are_unique() {
        let a = generate_verifier();
        let b = generate_verifier();
        assert_ne!(a, b, "two verifiers must not collide");
    }

    #[test]
    fn challenge_is_deterministic() {
        let verifier = "test-verifier-value";
        let c1 = compute_challenge(verifier);
        let c2 = compute_challenge(verifier);
        assert_eq!(c1, c2, "same verifier must produce same challenge");
    }

    #[test]
    fn challenge_is_url_safe_base64() {
        let challenge = compute_challenge("test-verifier");
        // SHA-256 produces 32 bytes → 43 base64url chars (no padding)
        assert_eq!(challenge.len(), 43);
        assert!(
            !challenge.contains('+') && !challenge.contains('/') && !challenge.contains('='),
            "challenge must not contain +, / or =: {challenge}"
        );
    }

    #[test]
    fn challenge_matches_known_value() {
        // Pre-computed: SHA256("hello") = 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
        // base64url of those 32 bytes = LPJNul-wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ
        let challenge = compute_challenge("hello");
        assert_eq!(challenge, "LPJNul-wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ");
    }

    #[test]
    fn authorization_url_contains_required_params() {
        let config = AuthConfig::default();
        let challenge = compute_challenge("test-verifier");
        let url = build_authorization_url(&config, &challenge);

        assert!(url.starts_with(&config.authorize_url));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(&format!("client_id={}", config.client_id)));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("code_challenge={challenge}")));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A9999%2Foauthcallback%2F"));
        assert!(url.contains("scope=wcapi%3Aview_institution_holdings%20refresh_token"));
    }

    #[test]
    fn session_pairs_verifier_with_its_challenge() {
        let session = PkceSession::new();
        assert_eq!(session.challenge(), compute_challenge(session.verifier()));
    }

    #[test]
    fn session_debug_redacts_verifier() {
        let session = PkceSession::new();
        let debug = format!("{session:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(session.verifier()));
    }
}
