//! Remote API ports - the CyberVault server as seen by the client

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{AuthSession, LedgerBlock, QueuedTransaction, ServerTransaction, SubmissionReceipt};

/// Outcome of a successful registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterOutcome {
    pub status: String,
    pub user_id: Option<String>,
}

/// Registration and login
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, username: &str, pin: &str) -> Result<RegisterOutcome>;

    /// Authenticate and return a fresh session
    async fn login(&self, username: &str, pin: &str) -> Result<AuthSession>;
}

/// Transaction submission and ledger views
#[async_trait]
pub trait TransactionApi: Send + Sync {
    /// Submit one transaction
    ///
    /// Any error (transport failure or non-success status) means the server
    /// did not accept it.
    async fn submit(&self, session: &AuthSession, tx: &QueuedTransaction)
        -> Result<SubmissionReceipt>;

    async fn list_transactions(&self) -> Result<Vec<ServerTransaction>>;

    async fn list_blockchain(&self) -> Result<Vec<LedgerBlock>>;

    /// Reachability check
    async fn ping(&self) -> Result<()>;
}
