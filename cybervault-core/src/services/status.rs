//! Status service - queue and session summary

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::AuthSession;
use crate::ports::ConnectivitySignal;
use crate::services::OfflineQueueService;

/// Status service for the client summary
pub struct StatusService {
    queue: Arc<OfflineQueueService>,
    connectivity: Arc<dyn ConnectivitySignal>,
    api_url: String,
}

impl StatusService {
    pub fn new(
        queue: Arc<OfflineQueueService>,
        connectivity: Arc<dyn ConnectivitySignal>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            connectivity,
            api_url: api_url.into(),
        }
    }

    /// Get overall status summary
    pub async fn get_status(&self, session: Option<&AuthSession>) -> Result<StatusSummary> {
        Ok(StatusSummary {
            online: self.connectivity.is_online(),
            queue_enabled: self.queue.is_enabled(),
            pending_transactions: self.queue.len().await?,
            user_id: session.map(|s| s.user_id.clone()),
            session_started: session.map(|s| s.started_at.to_rfc3339()),
            api_url: self.api_url.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub online: bool,
    pub queue_enabled: bool,
    pub pending_transactions: usize,
    pub user_id: Option<String>,
    pub session_started: Option<String>,
    pub api_url: String,
}
