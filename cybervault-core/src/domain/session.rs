//! Session domain model
//!
//! Two lifetimes are kept apart here: the client session (one CSRF token for
//! as long as the session file exists) and the authenticated session (from a
//! successful login until logout or idle expiry).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Anti-forgery token attached to mutating requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a fresh random token
    pub fn generate() -> Self {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Credentials issued by the server on login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: String,
    pub token: String,
    pub started_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
            started_at: now,
            last_active: now,
        }
    }

    /// True once the session has been idle longer than `idle_timeout`
    pub fn is_expired(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_active > idle_timeout
    }

    /// Record user activity, restarting the idle timer
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = now;
    }
}
