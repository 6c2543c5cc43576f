//! CyberVault Core - client logic for the CyberVault transaction service
//!
//! This crate implements the core client logic following hexagonal architecture:
//!
//! - **domain**: Core entities (QueuedTransaction, AuthSession, ledger records)
//! - **ports**: Trait definitions for external dependencies (QueueStore, TransactionApi, ...)
//! - **services**: Business logic orchestration (offline queue, auth, submission)
//! - **adapters**: Concrete implementations (DuckDB, HTTP client, connectivity probe)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use adapters::connectivity::{self, ConnectivityMonitor};
use adapters::cybervault_api::CyberVaultClient;
use adapters::duckdb::DuckDbQueueStore;
use adapters::session_file::SessionFile;
use config::Config;
use ports::{ConnectivitySignal, QueueStore, TransactionApi};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    AuthSession, LedgerBlock, QueueEntry, QueuedTransaction, ServerTransaction, SubmissionReceipt,
};

const QUEUE_FILENAME: &str = "queue.duckdb";

/// Outcome of [`CyberVaultContext::login`]
#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub session: AuthSession,
    /// The sync pass that follows every login
    pub sync: Option<SyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
}

/// Main context for CyberVault operations
///
/// Holds configuration, the adapters and every service wired together.
pub struct CyberVaultContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub api: Arc<CyberVaultClient>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub logger: Option<Arc<LoggingService>>,
    pub queue_service: Arc<OfflineQueueService>,
    pub transaction_service: TransactionService,
    pub auth_service: AuthService,
    pub ledger_service: LedgerService,
    pub status_service: StatusService,
}

impl CyberVaultContext {
    /// Create a new CyberVault context
    ///
    /// A queue database that cannot be opened disables offline queuing for
    /// this context only; everything else keeps working.
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let logger = LoggingService::new(data_dir, entry_point, env!("CARGO_PKG_VERSION"))
            .ok()
            .map(Arc::new);

        let session_file = SessionFile::load(data_dir)?;
        let api = Arc::new(CyberVaultClient::new(
            &config.api_url,
            session_file.csrf_token().clone(),
            config.request_timeout,
        )?);

        let connectivity = Arc::new(if config.force_offline {
            ConnectivityMonitor::forced_offline()
        } else {
            ConnectivityMonitor::new(false)
        });

        let store: Option<Arc<dyn QueueStore>> =
            match DuckDbQueueStore::open(&data_dir.join(QUEUE_FILENAME)) {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    if let Some(logger) = &logger {
                        let _ = logger.log_error("queue_open_failed", &e.to_string(), None);
                    }
                    None
                }
            };

        let tx_api: Arc<dyn TransactionApi> = api.clone();
        let signal: Arc<dyn ConnectivitySignal> = connectivity.clone();

        let queue_service = Arc::new(OfflineQueueService::new(
            store,
            Arc::clone(&tx_api),
            Arc::clone(&signal),
            logger.clone(),
        ));
        let transaction_service = TransactionService::new(
            Arc::clone(&tx_api),
            Arc::clone(&signal),
            Arc::clone(&queue_service),
            logger.clone(),
        );
        let auth_service = AuthService::new(
            api.clone(),
            session_file,
            config.idle_timeout(),
            logger.clone(),
        );
        let ledger_service = LedgerService::new(Arc::clone(&tx_api));
        let status_service =
            StatusService::new(Arc::clone(&queue_service), signal, config.api_url.clone());

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            api,
            connectivity,
            logger,
            queue_service,
            transaction_service,
            auth_service,
            ledger_service,
            status_service,
        })
    }

    /// Probe the server once and update the connectivity signal
    pub async fn refresh_connectivity(&self) -> bool {
        if self.connectivity.is_forced_offline() {
            return false;
        }
        connectivity::probe_once(self.api.as_ref(), &self.connectivity).await
    }

    /// Log in, then immediately run a sync pass
    ///
    /// A failing sync does not fail the login.
    pub async fn login(&self, username: &str, pin: &str) -> domain::result::Result<LoginOutcome> {
        let session = self.auth_service.login(username, pin).await?;
        self.refresh_connectivity().await;

        let (sync, sync_error) = match self.queue_service.sync(&session).await {
            Ok(report) => (Some(report), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Ok(LoginOutcome {
            session,
            sync,
            sync_error,
        })
    }

    /// Submit a transaction for the logged-in user, queuing it when offline
    pub async fn submit(&self, amount: &str, tx_type: &str) -> domain::result::Result<SubmitOutcome> {
        let session = self.auth_service.require_session()?;
        self.auth_service.touch()?;
        self.refresh_connectivity().await;
        self.transaction_service.submit(&session, amount, tx_type).await
    }

    /// Run one sync pass for the logged-in user
    pub async fn sync(&self) -> domain::result::Result<SyncReport> {
        let session = self.auth_service.require_session()?;
        self.auth_service.touch()?;
        self.refresh_connectivity().await;
        self.queue_service.sync(&session).await
    }

    /// Keep probing the server and sync on every reconnect
    ///
    /// Runs until the surrounding task is cancelled.
    pub async fn watch<F>(&self, session: &AuthSession, on_report: F)
    where
        F: FnMut(domain::result::Result<SyncReport>) + Send,
    {
        // Subscribed before the first probe so its result is not missed
        let rx = self.connectivity.subscribe();
        let api: Arc<dyn TransactionApi> = self.api.clone();
        let probe = connectivity::probe_loop(
            api,
            Arc::clone(&self.connectivity),
            self.config.probe_interval,
        );
        let reconnect = self.queue_service.run_reconnect_loop(session, rx, on_report);

        tokio::select! {
            _ = probe => {}
            _ = reconnect => {}
        }
    }

    /// Log a CLI command, ignoring logging failures
    pub fn log_command(&self, command: &str) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_command(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_api::{MockConfig, MockCyberVaultServer, MOCK_PIN, MOCK_TOKEN};
    use crate::domain::TransactionPayload;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn context_for(base_url: &str) -> (TempDir, CyberVaultContext) {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            serde_json::json!({
                "api": { "baseUrl": base_url, "timeoutSecs": 2 },
                "connectivity": { "probeIntervalSecs": 1 }
            })
            .to_string(),
        )
        .unwrap();
        let ctx = CyberVaultContext::new(dir.path(), EntryPoint::Cli).unwrap();
        (dir, ctx)
    }

    fn queued(amount: &str) -> QueuedTransaction {
        QueuedTransaction::capture(
            "uid-alice",
            TransactionPayload::parse(amount, "deposit").unwrap(),
            Utc::now(),
        )
    }

    fn submitted_amounts(server: &MockCyberVaultServer) -> Vec<String> {
        server
            .requests()
            .iter()
            .filter(|r| r.method == "POST" && r.path == "/transaction")
            .map(|r| r.json()["data"]["amount"].as_str().unwrap_or("").to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_login_syncs_queued_transactions() {
        let server = MockCyberVaultServer::start(MockConfig::default()).unwrap();
        let (_dir, ctx) = context_for(&server.base_url());

        ctx.queue_service.enqueue(&queued("25")).await.unwrap();
        ctx.queue_service.enqueue(&queued("40")).await.unwrap();

        let outcome = ctx.login("alice", MOCK_PIN).await.unwrap();
        assert!(outcome.sync_error.is_none());

        let report = outcome.sync.unwrap();
        assert_eq!(report.submitted(), 2);
        assert_eq!(report.remaining, 0);
        assert_eq!(ctx.queue_service.len().await.unwrap(), 0);
        assert_eq!(submitted_amounts(&server), vec!["25", "40"]);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_queue_alone() {
        let server = MockCyberVaultServer::start(MockConfig::default()).unwrap();
        let (_dir, ctx) = context_for(&server.base_url());
        ctx.queue_service.enqueue(&queued("25")).await.unwrap();

        assert!(ctx.login("alice", "000000").await.is_err());
        assert_eq!(ctx.queue_service.len().await.unwrap(), 1);
        assert!(submitted_amounts(&server).is_empty());
    }

    #[tokio::test]
    async fn test_watch_syncs_when_server_comes_up() {
        // Reserve a port, then leave it closed so the first probes fail
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let (_dir, ctx) = context_for(&format!("http://127.0.0.1:{}", port));
        ctx.queue_service.enqueue(&queued("25")).await.unwrap();

        let session = AuthSession::new("uid-alice", MOCK_TOKEN, Utc::now());
        let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel();

        let scenario = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            assert!(!ctx.connectivity.is_online());
            assert_eq!(ctx.queue_service.len().await.unwrap(), 1);

            let server = MockCyberVaultServer::start_on(port, MockConfig::default()).unwrap();
            let report = tokio::time::timeout(Duration::from_secs(10), report_rx.recv())
                .await
                .unwrap()
                .unwrap();
            (server, report)
        };

        let (server, report) = tokio::select! {
            _ = ctx.watch(&session, move |r| {
                let _ = report_tx.send(r);
            }) => panic!("watch returned on its own"),
            out = scenario => out,
        };

        let report = report.unwrap();
        assert_eq!(report.submitted(), 1);
        assert_eq!(report.remaining, 0);
        assert_eq!(ctx.queue_service.len().await.unwrap(), 0);
        assert_eq!(submitted_amounts(&server), vec!["25"]);
    }
}
