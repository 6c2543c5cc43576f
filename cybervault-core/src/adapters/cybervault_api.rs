//! CyberVault API client
//!
//! Talks to the remote CyberVault server over HTTP. Auth, transaction
//! submission and the read-only ledger views all go through here.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{
    AuthSession, CsrfToken, LedgerBlock, QueuedTransaction, ServerTransaction, SubmissionReceipt,
};
use crate::ports::{AuthApi, RegisterOutcome, TransactionApi};

/// Default server URL
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Environment variable overriding the server URL
pub const API_URL_ENV: &str = "CYBERVAULT_API_URL";

const CSRF_HEADER: &str = "X-CSRF-Token";

// =============================================================================
// API Response Models
// =============================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    status: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: Option<String>,
    user_id: Option<String>,
    token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    #[serde(default)]
    transactions: Vec<ServerTransaction>,
}

#[derive(Debug, Deserialize)]
struct BlockchainResponse {
    #[serde(default)]
    blockchain: Vec<LedgerBlock>,
}

// =============================================================================
// HTTP Client
// =============================================================================

/// CyberVault API client
#[derive(Debug, Clone)]
pub struct CyberVaultClient {
    client: Client,
    base_url: String,
    csrf_token: CsrfToken,
    timeout: Duration,
}

impl CyberVaultClient {
    /// Create a client for the given server
    ///
    /// The CSRF token is sent on every mutating request for the lifetime of
    /// the client session.
    pub fn new(base_url: &str, csrf_token: CsrfToken, timeout: Duration) -> anyhow::Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("Invalid API URL: {}", base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("API URL must use http or https: {}", base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST with the JSON content type and CSRF header set
    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(CSRF_HEADER, self.csrf_token.as_str())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| self.map_request_error(e))
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::transport(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::transport(format!(
                "Unable to connect to CyberVault server at {}",
                self.base_url
            ))
        } else {
            Error::transport(format!("Request failed: {}", error))
        }
    }

    /// Turn a non-success response into an error, keeping the server's text
    async fn status_error(response: Response) -> Error {
        let status = response.status();
        let message = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
            .and_then(|body| body.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        match status {
            StatusCode::UNAUTHORIZED => Error::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => Error::Rejected {
                status: status.as_u16(),
                message: "Rate limit exceeded. Please wait a moment and try again.".to_string(),
            },
            _ => Error::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Other(format!("Failed to parse {} response: {}", what, e)))
    }
}

#[async_trait]
impl AuthApi for CyberVaultClient {
    async fn register(&self, username: &str, pin: &str) -> Result<RegisterOutcome> {
        let response = self
            .send(self.post("/register").json(&json!({ "username": username, "pin": pin })))
            .await?;

        if !response.status().is_success() {
            // Registration refusals are shown to the user as-is
            return Err(match Self::status_error(response).await {
                Error::Rejected { message, .. } => Error::Auth(message),
                other => other,
            });
        }

        let body: RegisterResponse = Self::read_json(response, "register").await?;
        Ok(RegisterOutcome {
            status: body.status.unwrap_or_else(|| "registered".to_string()),
            user_id: body.user_id,
        })
    }

    async fn login(&self, username: &str, pin: &str) -> Result<AuthSession> {
        let response = self
            .send(self.post("/login").json(&json!({ "username": username, "pin": pin })))
            .await?;

        if !response.status().is_success() {
            return Err(match Self::status_error(response).await {
                Error::Rejected { message, .. } => Error::Auth(message),
                other => other,
            });
        }

        let body: LoginResponse = Self::read_json(response, "login").await?;
        match (body.status.as_deref(), body.user_id, body.token) {
            (Some("authenticated"), Some(user_id), Some(token)) => {
                Ok(AuthSession::new(user_id, token, Utc::now()))
            }
            _ => Err(Error::Auth(
                body.error.unwrap_or_else(|| "Login failed".to_string()),
            )),
        }
    }
}

#[async_trait]
impl TransactionApi for CyberVaultClient {
    async fn submit(
        &self,
        session: &AuthSession,
        tx: &QueuedTransaction,
    ) -> Result<SubmissionReceipt> {
        let response = self
            .send(
                self.post("/transaction")
                    .bearer_auth(&session.token)
                    .json(&tx.to_submission()),
            )
            .await?;

        if !response.status().is_success() {
            return Err(match Self::status_error(response).await {
                Error::Auth(_) => {
                    Error::Auth("Session expired. Run 'cv login' again.".to_string())
                }
                other => other,
            });
        }

        // The server accepted it; an unreadable verdict must not make the
        // caller resubmit, so it degrades to "no fraud flag"
        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn list_transactions(&self) -> Result<Vec<ServerTransaction>> {
        let response = self
            .send(self.client.get(self.url("/transactions")))
            .await?;
        let body: TransactionsResponse = Self::read_json(response, "transactions").await?;
        Ok(body.transactions)
    }

    async fn list_blockchain(&self) -> Result<Vec<LedgerBlock>> {
        let response = self.send(self.client.get(self.url("/blockchain"))).await?;
        let body: BlockchainResponse = Self::read_json(response, "blockchain").await?;
        Ok(body.blockchain)
    }

    async fn ping(&self) -> Result<()> {
        let response = self.send(self.client.get(self.url("/status"))).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response).await)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
