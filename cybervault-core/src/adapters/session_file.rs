//! session.json - the client session on disk
//!
//! ```json
//! {
//!   "csrfToken": "...",
//!   "auth": { "userId": "...", "token": "...", "startedAt": "...", "lastActive": "..." }
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthSession, CsrfToken};

const SESSION_FILENAME: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionContents {
    csrf_token: CsrfToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth: Option<AuthSession>,
}

/// Persistent client session
///
/// The CSRF token is created the first time the file is loaded and kept
/// until the file is deleted. The auth part comes and goes with
/// login/logout.
#[derive(Debug)]
pub struct SessionFile {
    path: PathBuf,
    contents: SessionContents,
}

impl SessionFile {
    /// Load session.json from the data directory, creating it if missing
    ///
    /// An unreadable file is replaced by a fresh session rather than
    /// failing the command.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SESSION_FILENAME);

        let existing = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<SessionContents>(&content).ok()
        } else {
            None
        };

        let fresh = existing.is_none();
        let session = Self {
            path,
            contents: existing.unwrap_or_else(|| SessionContents {
                csrf_token: CsrfToken::generate(),
                auth: None,
            }),
        };

        if fresh {
            session.save()?;
        }
        Ok(session)
    }

    pub fn csrf_token(&self) -> &CsrfToken {
        &self.contents.csrf_token
    }

    pub fn auth(&self) -> Option<&AuthSession> {
        self.contents.auth.as_ref()
    }

    /// Store the auth session and persist
    pub fn set_auth(&mut self, auth: AuthSession) -> Result<()> {
        self.contents.auth = Some(auth);
        self.save()
    }

    /// Drop the auth session, keeping the CSRF token
    pub fn clear_auth(&mut self) -> Result<()> {
        self.contents.auth = None;
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.contents)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
