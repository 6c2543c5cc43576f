//! Offline queue service - holds transactions captured while offline and
//! reconciles them with the server
//!
//! A sync pass submits entries one at a time in insertion order and removes
//! exactly the ones the server accepted. Anything that failed, or was never
//! attempted, stays queued for the next pass.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::domain::result::{Error, Result};
use crate::domain::{AuthSession, QueueEntry, QueuedTransaction};
use crate::ports::{ConnectivitySignal, QueueStore, TransactionApi};
use crate::services::logging::{record, LogEvent, LoggingService};

/// Why a sync pass did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSkipReason {
    Offline,
    QueueDisabled,
    Empty,
}

/// Outcome for one queued entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntryOutcome {
    Submitted { seq: i64, fraud_flag: bool },
    Failed { seq: i64, reason: String },
}

impl EntryOutcome {
    pub fn seq(&self) -> i64 {
        match self {
            EntryOutcome::Submitted { seq, .. } | EntryOutcome::Failed { seq, .. } => *seq,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, EntryOutcome::Submitted { .. })
    }
}

/// Result of one sync pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SyncSkipReason>,
    pub outcomes: Vec<EntryOutcome>,
    /// Entries still queued after the pass
    pub remaining: usize,
}

impl SyncReport {
    fn skipped(reason: SyncSkipReason, remaining: usize) -> Self {
        Self {
            skipped: Some(reason),
            outcomes: Vec::new(),
            remaining,
        }
    }

    pub fn submitted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_submitted()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.submitted()
    }

    pub fn flagged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Submitted { fraud_flag: true, .. }))
            .count()
    }
}

/// Offline queue manager
pub struct OfflineQueueService {
    /// `None` when the store could not be opened; queuing is then disabled
    store: Option<Arc<dyn QueueStore>>,
    api: Arc<dyn TransactionApi>,
    connectivity: Arc<dyn ConnectivitySignal>,
    logger: Option<Arc<LoggingService>>,
    /// One sync pass at a time, so a reconnect never double-submits
    sync_guard: Mutex<()>,
}

impl OfflineQueueService {
    pub fn new(
        store: Option<Arc<dyn QueueStore>>,
        api: Arc<dyn TransactionApi>,
        connectivity: Arc<dyn ConnectivitySignal>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            store,
            api,
            connectivity,
            logger,
            sync_guard: Mutex::new(()),
        }
    }

    /// Whether offline queuing is available this session
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> Result<&Arc<dyn QueueStore>> {
        self.store.as_ref().ok_or_else(|| {
            Error::QueueUnavailable("offline queue could not be opened this session".to_string())
        })
    }

    /// Append a transaction; returns its sequence number once persisted
    pub async fn enqueue(&self, tx: &QueuedTransaction) -> Result<i64> {
        let seq = self.store()?.enqueue(tx).await?;
        record(
            self.logger.as_deref(),
            LogEvent::new("transaction_queued").with_context(format!("seq={}", seq)),
        );
        Ok(seq)
    }

    /// Snapshot of every queued entry, oldest first
    pub async fn drain_all(&self) -> Result<Vec<QueueEntry>> {
        self.store()?.drain_all().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store()?.clear().await?;
        record(self.logger.as_deref(), LogEvent::new("queue_cleared"));
        Ok(())
    }

    /// Number of queued entries; zero when queuing is disabled
    pub async fn len(&self) -> Result<usize> {
        match &self.store {
            Some(store) => store.len().await,
            None => Ok(0),
        }
    }

    /// Run one sync pass
    ///
    /// Offline or disabled: no network call, queue untouched. Otherwise each
    /// entry is submitted in order, awaiting each response, and only the
    /// accepted entries are removed, in one step at the end.
    pub async fn sync(&self, session: &AuthSession) -> Result<SyncReport> {
        let _pass = self.sync_guard.lock().await;

        let Some(store) = self.store.as_ref() else {
            return Ok(SyncReport::skipped(SyncSkipReason::QueueDisabled, 0));
        };

        if !self.connectivity.is_online() {
            let remaining = store.len().await?;
            return Ok(SyncReport::skipped(SyncSkipReason::Offline, remaining));
        }

        let pending = store.drain_all().await?;
        if pending.is_empty() {
            return Ok(SyncReport::skipped(SyncSkipReason::Empty, 0));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for entry in &pending {
            outcomes.push(self.submit_entry(session, entry).await);
        }

        let accepted: Vec<i64> = outcomes
            .iter()
            .filter(|o| o.is_submitted())
            .map(EntryOutcome::seq)
            .collect();
        store.remove(&accepted).await?;

        let report = SyncReport {
            skipped: None,
            outcomes,
            remaining: store.len().await?,
        };

        record(
            self.logger.as_deref(),
            LogEvent::new("sync_completed").with_context(format!(
                "submitted={} failed={} remaining={}",
                report.submitted(),
                report.failed(),
                report.remaining
            )),
        );

        Ok(report)
    }

    async fn submit_entry(&self, session: &AuthSession, entry: &QueueEntry) -> EntryOutcome {
        if !entry.transaction.verify_integrity() {
            let reason = "integrity hash does not match queued contents".to_string();
            self.log_entry_failure(entry.seq, &reason);
            return EntryOutcome::Failed {
                seq: entry.seq,
                reason,
            };
        }

        match self.api.submit(session, &entry.transaction).await {
            Ok(receipt) => EntryOutcome::Submitted {
                seq: entry.seq,
                fraud_flag: receipt.fraud_flag,
            },
            Err(e) => {
                let reason = e.to_string();
                self.log_entry_failure(entry.seq, &reason);
                EntryOutcome::Failed {
                    seq: entry.seq,
                    reason,
                }
            }
        }
    }

    fn log_entry_failure(&self, seq: i64, reason: &str) {
        record(
            self.logger.as_deref(),
            LogEvent::new("sync_entry_failed")
                .with_context(format!("seq={}", seq))
                .with_error(reason),
        );
    }

    /// Sync on every offline -> online transition seen on `rx` until the
    /// connectivity signal goes away
    ///
    /// Subscribe before anything can flip the signal, or the first
    /// transition is missed. Each completed pass is handed to `on_report`.
    /// A failing pass is logged and the loop keeps waiting for the next
    /// transition.
    pub async fn run_reconnect_loop<F>(
        &self,
        session: &AuthSession,
        mut rx: watch::Receiver<bool>,
        mut on_report: F,
    ) where
        F: FnMut(Result<SyncReport>) + Send,
    {
        // Changes since subscribing are still unseen, so a flip to online
        // that happened before this point is handled as a transition
        let mut was_online = false;

        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            let came_online = online && !was_online;
            was_online = online;

            if came_online {
                let result = self.sync(session).await;
                if let Err(e) = &result {
                    record(
                        self.logger.as_deref(),
                        LogEvent::new("sync_failed").with_error(e.to_string()),
                    );
                }
                on_report(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::connectivity::ConnectivityMonitor;
    use crate::adapters::duckdb::DuckDbQueueStore;
    use crate::domain::{LedgerBlock, ServerTransaction, SubmissionReceipt, TransactionPayload};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex as StdMutex;

    /// Records submitted amounts; fails amounts listed in `fail`
    #[derive(Default)]
    struct RecordingApi {
        fail: Vec<String>,
        submitted: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl TransactionApi for RecordingApi {
        async fn submit(
            &self,
            _session: &AuthSession,
            tx: &QueuedTransaction,
        ) -> Result<SubmissionReceipt> {
            let amount = tx.payload.amount.to_string();
            self.submitted.lock().unwrap().push(amount.clone());
            if self.fail.contains(&amount) {
                return Err(Error::transport("connection reset"));
            }
            Ok(SubmissionReceipt {
                status: Some("queued".to_string()),
                fraud_flag: amount == "5000",
            })
        }

        async fn list_transactions(&self) -> Result<Vec<ServerTransaction>> {
            Ok(Vec::new())
        }

        async fn list_blockchain(&self) -> Result<Vec<LedgerBlock>> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn session() -> AuthSession {
        AuthSession::new("uid-1", "tok", Utc::now())
    }

    fn tx(amount: &str) -> QueuedTransaction {
        QueuedTransaction::capture(
            "uid-1",
            TransactionPayload::parse(amount, "deposit").unwrap(),
            Utc::now(),
        )
    }

    fn service(
        api: Arc<RecordingApi>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> OfflineQueueService {
        let store: Arc<dyn QueueStore> = Arc::new(DuckDbQueueStore::open_in_memory().unwrap());
        OfflineQueueService::new(Some(store), api, monitor, None)
    }

    #[tokio::test]
    async fn test_sync_offline_makes_no_calls() {
        let api = Arc::new(RecordingApi::default());
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let queue = service(api.clone(), monitor);

        queue.enqueue(&tx("10")).await.unwrap();
        let report = queue.sync(&session()).await.unwrap();

        assert_eq!(report.skipped, Some(SyncSkipReason::Offline));
        assert_eq!(report.remaining, 1);
        assert!(api.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_empty_queue() {
        let api = Arc::new(RecordingApi::default());
        let queue = service(api, Arc::new(ConnectivityMonitor::new(true)));

        let report = queue.sync(&session()).await.unwrap();
        assert_eq!(report.skipped, Some(SyncSkipReason::Empty));
    }

    #[tokio::test]
    async fn test_sync_keeps_failed_entries() {
        let api = Arc::new(RecordingApi {
            fail: vec!["10".to_string()],
            ..Default::default()
        });
        let queue = service(api.clone(), Arc::new(ConnectivityMonitor::new(true)));

        let a = tx("10");
        queue.enqueue(&a).await.unwrap();
        queue.enqueue(&tx("5000")).await.unwrap();

        let report = queue.sync(&session()).await.unwrap();
        assert_eq!(report.submitted(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.flagged(), 1);
        assert_eq!(report.remaining, 1);

        let left = queue.drain_all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].transaction, a);
        assert_eq!(*api.submitted.lock().unwrap(), vec!["10", "5000"]);
    }

    #[tokio::test]
    async fn test_tampered_entry_is_not_sent() {
        let api = Arc::new(RecordingApi::default());
        let queue = service(api.clone(), Arc::new(ConnectivityMonitor::new(true)));

        let mut tampered = tx("10");
        tampered.payload.amount = rust_decimal::Decimal::new(99, 0);
        queue.enqueue(&tampered).await.unwrap();

        let report = queue.sync(&session()).await.unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.remaining, 1);
        assert!(api.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_queue() {
        let api = Arc::new(RecordingApi::default());
        let queue = OfflineQueueService::new(
            None,
            api,
            Arc::new(ConnectivityMonitor::new(true)),
            None,
        );

        assert!(!queue.is_enabled());
        assert!(matches!(
            queue.enqueue(&tx("10")).await,
            Err(Error::QueueUnavailable(_))
        ));
        assert_eq!(queue.len().await.unwrap(), 0);
        let report = queue.sync(&session()).await.unwrap();
        assert_eq!(report.skipped, Some(SyncSkipReason::QueueDisabled));
    }

    #[tokio::test]
    async fn test_reconnect_loop_syncs_on_online_edge() {
        let api = Arc::new(RecordingApi::default());
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let queue = Arc::new(service(api.clone(), monitor.clone()));
        queue.enqueue(&tx("10")).await.unwrap();

        let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel();
        let rx = monitor.subscribe();
        let loop_queue = queue.clone();
        let handle = tokio::spawn(async move {
            let session = session();
            loop_queue
                .run_reconnect_loop(&session, rx, move |r| {
                    let _ = report_tx.send(r.map(|r| r.submitted()));
                })
                .await;
        });

        monitor.set_online(true);

        let submitted = tokio::time::timeout(std::time::Duration::from_secs(5), report_rx.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(submitted, 1);
        assert_eq!(queue.len().await.unwrap(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_reconnect_loop_handles_flip_before_first_poll() {
        let api = Arc::new(RecordingApi::default());
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let queue = service(api.clone(), monitor.clone());
        queue.enqueue(&tx("10")).await.unwrap();

        let rx = monitor.subscribe();
        monitor.set_online(true);

        let mut reports = Vec::new();
        let session = session();
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            queue.run_reconnect_loop(&session, rx, |r| reports.push(r.map(|r| r.submitted()))),
        )
        .await;

        assert_eq!(reports.len(), 1);
        assert_eq!(*reports[0].as_ref().unwrap(), 1);
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
