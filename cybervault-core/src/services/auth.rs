//! Auth service - registration, login, logout and the idle timeout

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};

use crate::adapters::session_file::SessionFile;
use crate::domain::result::{Error, Result};
use crate::domain::{check_pin_strength, AuthSession};
use crate::ports::{AuthApi, RegisterOutcome};
use crate::services::logging::{record, LogEvent, LoggingService};

pub struct AuthService {
    api: Arc<dyn AuthApi>,
    session: Mutex<SessionFile>,
    idle_timeout: Duration,
    logger: Option<Arc<LoggingService>>,
}

fn require_fields(username: &str, pin: &str) -> Result<()> {
    if username.trim().is_empty() || pin.is_empty() {
        return Err(Error::validation("Username and PIN are required"));
    }
    Ok(())
}

impl AuthService {
    pub fn new(
        api: Arc<dyn AuthApi>,
        session: SessionFile,
        idle_timeout: Duration,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            api,
            session: Mutex::new(session),
            idle_timeout,
            logger,
        }
    }

    fn session_file(&self) -> Result<MutexGuard<'_, SessionFile>> {
        self.session
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))
    }

    /// Register a new user
    ///
    /// Weak PINs are refused locally; nothing is sent for them.
    pub async fn register(&self, username: &str, pin: &str) -> Result<RegisterOutcome> {
        require_fields(username, pin)?;

        let strength = check_pin_strength(pin);
        if !strength.is_strong() {
            return Err(Error::validation(strength.message()));
        }

        let outcome = self.api.register(username.trim(), pin).await?;
        record(self.logger.as_deref(), LogEvent::new("user_registered"));
        Ok(outcome)
    }

    /// Authenticate and persist the new session
    pub async fn login(&self, username: &str, pin: &str) -> Result<AuthSession> {
        require_fields(username, pin)?;

        let session = match self.api.login(username.trim(), pin).await {
            Ok(session) => session,
            Err(e) => {
                record(
                    self.logger.as_deref(),
                    LogEvent::new("login_failed").with_error(e.to_string()),
                );
                return Err(e);
            }
        };

        self.session_file()?
            .set_auth(session.clone())
            .map_err(|e| Error::Other(e.to_string()))?;
        record(self.logger.as_deref(), LogEvent::new("login_succeeded"));
        Ok(session)
    }

    /// End the authenticated session; returns false if there was none
    ///
    /// The CSRF token outlives the logout.
    pub fn logout(&self) -> Result<bool> {
        let mut file = self.session_file()?;
        let was_logged_in = file.auth().is_some();
        file.clear_auth().map_err(|e| Error::Other(e.to_string()))?;
        if was_logged_in {
            record(self.logger.as_deref(), LogEvent::new("logout"));
        }
        Ok(was_logged_in)
    }

    /// The live session, if any; an idle one is torn down here
    pub fn current_session(&self) -> Result<Option<AuthSession>> {
        let mut file = self.session_file()?;
        let Some(auth) = file.auth().cloned() else {
            return Ok(None);
        };

        if auth.is_expired(Utc::now(), self.idle_timeout) {
            file.clear_auth().map_err(|e| Error::Other(e.to_string()))?;
            record(self.logger.as_deref(), LogEvent::new("session_expired"));
            return Ok(None);
        }
        Ok(Some(auth))
    }

    /// Like [`current_session`](Self::current_session) but an error when
    /// logged out
    pub fn require_session(&self) -> Result<AuthSession> {
        self.current_session()?.ok_or(Error::NotLoggedIn)
    }

    /// Restart the idle timer after user activity
    pub fn touch(&self) -> Result<()> {
        let mut file = self.session_file()?;
        if let Some(mut auth) = file.auth().cloned() {
            auth.touch(Utc::now());
            file.set_auth(auth).map_err(|e| Error::Other(e.to_string()))?;
        }
        Ok(())
    }
}
