//! Single-slot token storage
//!
//! Persists the one [`TokenRecord`] this installation holds. Writes use
//! atomic temp-file + rename to prevent corruption on crash; a tokio Mutex
//! serializes concurrent writers (request-time refresh races are tolerated,
//! last write wins). Absence of the file means "not authenticated" — the
//! store never creates an empty slot.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::token::TokenRecord;

/// Thread-safe single-slot token file manager.
pub struct TokenStore {
    path: PathBuf,
    state: Mutex<Option<TokenRecord>>,
}

impl TokenStore {
    /// Open the store at the given file path.
    ///
    /// A missing file is the logged-out state, not an error. A file that
    /// exists but does not parse is an error — the installation should not
    /// silently discard whatever is there.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let record: TokenRecord = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing token file: {e}")))?;
            debug!(path = %path.display(), expires_at = %record.expires_at, "loaded stored token");
            Some(record)
        } else {
            debug!(path = %path.display(), "no token file, starting logged out");
            None
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Current record, if any. Clones the in-memory state.
    pub async fn load(&self) -> Option<TokenRecord> {
        let state = self.state.lock().await;
        state.clone()
    }

    /// Replace the slot with a new record and persist to disk.
    ///
    /// The slot is always overwritten wholesale; there is no partial update.
    pub async fn save(&self, record: TokenRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        write_atomic(&self.path, &record).await?;
        *state = Some(record);
        Ok(())
    }

    /// Empty the slot and remove the file (explicit logout).
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "cleared stored token");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!("removing token file: {e}"))),
        }
    }
}

/// Write the record to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains OAuth tokens.
async fn write_atomic(path: &Path, record: &TokenRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| Error::Parse(format!("serializing token record: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".token.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted token");
    Ok(())
}
