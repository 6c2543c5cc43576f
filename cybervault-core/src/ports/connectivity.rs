//! Connectivity port - the client's notion of network reachability

use tokio::sync::watch;

/// Online/offline state plus change notification
pub trait ConnectivitySignal: Send + Sync {
    /// Current state
    fn is_online(&self) -> bool;

    /// Receiver that wakes on every state change
    ///
    /// Callers detect the offline -> online edge by comparing successive
    /// values.
    fn subscribe(&self) -> watch::Receiver<bool>;
}
