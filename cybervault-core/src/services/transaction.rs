//! Transaction service - submit now or queue for later

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{AuthSession, QueuedTransaction, SubmissionReceipt, TransactionPayload};
use crate::ports::{ConnectivitySignal, TransactionApi};
use crate::services::logging::{record, LogEvent, LoggingService};
use crate::services::OfflineQueueService;

/// What happened to a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Sent to the server, which returned its verdict
    Submitted { receipt: SubmissionReceipt },
    /// Offline: stored locally until the next sync pass
    Queued { seq: i64 },
}

pub struct TransactionService {
    api: Arc<dyn TransactionApi>,
    connectivity: Arc<dyn ConnectivitySignal>,
    queue: Arc<OfflineQueueService>,
    logger: Option<Arc<LoggingService>>,
}

impl TransactionService {
    pub fn new(
        api: Arc<dyn TransactionApi>,
        connectivity: Arc<dyn ConnectivitySignal>,
        queue: Arc<OfflineQueueService>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            api,
            connectivity,
            queue,
            logger,
        }
    }

    /// Validate, capture and either submit or queue a transaction
    ///
    /// Validation failures return before anything is sent or stored. Online
    /// submission errors are returned to the caller and nothing is queued.
    pub async fn submit(
        &self,
        session: &AuthSession,
        amount: &str,
        tx_type: &str,
    ) -> Result<SubmitOutcome> {
        let payload = TransactionPayload::parse(amount, tx_type)?;
        let tx = QueuedTransaction::capture(&session.user_id, payload, Utc::now());

        if !self.connectivity.is_online() {
            let seq = self.queue.enqueue(&tx).await?;
            return Ok(SubmitOutcome::Queued { seq });
        }

        let receipt = self.api.submit(session, &tx).await?;
        if receipt.fraud_flag {
            record(self.logger.as_deref(), LogEvent::new("transaction_flagged"));
        } else {
            record(self.logger.as_deref(), LogEvent::new("transaction_submitted"));
        }
        Ok(SubmitOutcome::Submitted { receipt })
    }
}
