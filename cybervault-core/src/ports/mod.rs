//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these traits, not on concrete implementations.

mod connectivity;
mod queue_store;
mod remote_api;

pub use connectivity::ConnectivitySignal;
pub use queue_store::QueueStore;
pub use remote_api::{AuthApi, RegisterOutcome, TransactionApi};
