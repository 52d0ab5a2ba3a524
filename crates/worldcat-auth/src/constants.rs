//! OCLC OAuth constants
//!
//! Public OAuth client configuration for the WorldCat Discovery API. These
//! values are not secrets — the WSKey identifies the public client
//! application and the redirect URI is a loopback address that is never
//! actually fetched. The actual secrets (access/refresh tokens) are managed
//! by the token store.

/// Authorization endpoint, browser-navigated (institution registry id 65586)
pub const AUTHORIZE_ENDPOINT: &str = "https://oauth.oclc.org/auth/65586";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://oauth.oclc.org/token";

/// Public client WSKey (client_id)
pub const APP_CLIENT_WSKEY: &str =
    "VO2qsUtIWQHI7N39EIKblovaTb1Yjh2VVGN5IXfTlzMp9jcdKEGSQ5d16EcNiVfRjYPBU5LPI6bhqnnl";

/// Loopback redirect URI. Intercepted client-side before the request leaves
/// the application; nothing listens on this address.
pub const REDIRECT_URI: &str = "http://127.0.0.1:9999/oauthcallback/";

/// OAuth scopes: institution holdings read access plus a refresh token
pub const SCOPES: &str = "wcapi:view_institution_holdings refresh_token";

/// File name of the single persisted token slot
pub const TOKEN_SLOT: &str = "oclc_oauth_token.json";

/// Default timeout applied to token and search HTTP calls. The interactive
/// browser step is bounded only by user action and carries no timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
