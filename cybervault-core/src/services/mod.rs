//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod auth;
mod ledger;
pub mod logging;
pub mod migration;
mod queue;
mod status;
mod transaction;

pub use auth::AuthService;
pub use ledger::LedgerService;
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use queue::{EntryOutcome, OfflineQueueService, SyncReport, SyncSkipReason};
pub use status::{StatusService, StatusSummary};
pub use transaction::{SubmitOutcome, TransactionService};
