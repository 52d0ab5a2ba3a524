//! Error types for search operations

/// Errors from query construction and search requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed query construction (bad search type, bad distance unit).
    /// Raised synchronously, before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No usable token and interactive login not completed; the user
    /// should be prompted to log in.
    #[error("not logged in")]
    NotAuthenticated,

    /// Upstream failure after the recovery attempt is exhausted. `status`
    /// is `None` for transport-level failures (timeouts, connection
    /// errors); `message` is the human-readable detail for display.
    #[error("search failed: {message}")]
    Search { status: Option<u16>, message: String },
}

/// Result alias for search operations.
pub type Result<T> = std::result::Result<T, Error>;
