//! WorldCat OAuth authentication library
//!
//! Provides PKCE flow generation, token exchange/refresh, single-slot token
//! storage, and the token lifecycle state machine for the WorldCat Discovery
//! desktop client. This crate is a standalone library with no dependency on
//! any UI shell — it can be tested and used independently.
//!
//! Credential flow:
//! 1. `TokenLifecycleManager::login()` opens an interactive browser surface
//!    navigated to the PKCE authorization URL
//! 2. The shell intercepts the loopback redirect and passes it to
//!    `TokenLifecycleManager::handle_redirect()`
//! 3. The active `AuthorizationFlow` exchanges the authorization code for a
//!    `TokenRecord` via `token::exchange_code()`
//! 4. The record is persisted via `store::TokenStore::save()`
//! 5. `TokenLifecycleManager::get_token()` refreshes it silently around
//!    API calls via `token::refresh_token()`

pub mod config;
pub mod constants;
pub mod error;
pub mod flow;
pub mod lifecycle;
pub mod pkce;
pub mod store;
pub mod token;

pub use config::AuthConfig;
pub use constants::*;
pub use error::{Error, Result};
pub use flow::{AuthEvent, AuthSurface, AuthorizationFlow, FlowState, SurfaceProvider};
pub use lifecycle::TokenLifecycleManager;
pub use pkce::{PkceSession, build_authorization_url, compute_challenge, generate_verifier};
pub use store::TokenStore;
pub use token::{TokenRecord, TokenResponse, exchange_code, refresh_token};
