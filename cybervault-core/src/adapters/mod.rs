//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the QueueStore port
//! - CyberVault HTTP client for AuthApi and TransactionApi
//! - Watch channel fed by a server probe for ConnectivitySignal
//! - session.json for the persisted client session

pub mod connectivity;
pub mod cybervault_api;
pub mod duckdb;
pub mod session_file;

#[cfg(test)]
pub mod mock_api;
