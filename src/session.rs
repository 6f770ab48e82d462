use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_FILE: &str = "session.json";

#[derive(Error, Debug)]
pub enum SessionPersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted session credential: token plus the username used for
/// attribution on listings and transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub token: String,
    pub username: String,
}

/// File-backed session state. This is the only writer of the session token;
/// everything else reads through it.
pub struct SessionStore {
    file_path: PathBuf,
}

impl SessionStore {
    pub fn new(app_data_dir: &Path) -> Self {
        Self {
            file_path: app_data_dir.join(SESSION_FILE),
        }
    }

    /// True iff a session token is present on disk.
    pub fn is_authenticated(&self) -> bool {
        self.load().is_some()
    }

    /// The stored session, if any. Unreadable or malformed files count as
    /// "no session" rather than an error.
    pub fn load(&self) -> Option<StoredSession> {
        let contents = fs::read_to_string(&self.file_path).ok()?;
        let session: StoredSession = serde_json::from_str(&contents).ok()?;
        if session.token.is_empty() {
            return None;
        }
        Some(session)
    }

    pub fn username(&self) -> Option<String> {
        self.load().map(|s| s.username)
    }

    pub fn save(&self, session: &StoredSession) -> Result<(), SessionPersistError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.file_path, json)?;
        Ok(())
    }

    /// Drop the persisted session. Idempotent.
    pub fn clear(&self) -> Result<(), SessionPersistError> {
        match fs::remove_file(&self.file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
