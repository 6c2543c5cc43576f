//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

pub mod ledger;
pub mod pin;
pub mod result;
mod session;
mod transaction;

pub use ledger::{LedgerBlock, ServerTransaction, SubmissionReceipt};
pub use pin::{check_pin_strength, PinStrength};
pub use session::{AuthSession, CsrfToken};
pub use transaction::{QueueEntry, QueuedTransaction, TransactionPayload, TransactionSubmission};
