//! Connectivity monitor
//!
//! A terminal client has no browser online/offline events, so reachability
//! of the server stands in for them: `probe_loop` pings `GET /status` and
//! feeds the result into a watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::ports::{ConnectivitySignal, TransactionApi};

/// Environment variable forcing the client offline
pub const OFFLINE_ENV: &str = "CYBERVAULT_OFFLINE";

/// Watch-channel backed connectivity signal
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
    forced_offline: bool,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self {
            tx,
            forced_offline: false,
        }
    }

    /// A monitor that reports offline no matter what the probe sees
    pub fn forced_offline() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx,
            forced_offline: true,
        }
    }

    pub fn is_forced_offline(&self) -> bool {
        self.forced_offline
    }

    /// Update the state; subscribers are woken only on an actual change
    pub fn set_online(&self, online: bool) -> bool {
        let online = online && !self.forced_offline;
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }
}

impl ConnectivitySignal for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Probe the server once and record the result
pub async fn probe_once(api: &dyn TransactionApi, monitor: &ConnectivityMonitor) -> bool {
    let online = api.ping().await.is_ok();
    monitor.set_online(online);
    online
}

/// Probe the server every `interval`; runs until the task is cancelled
pub async fn probe_loop(
    api: Arc<dyn TransactionApi>,
    monitor: Arc<ConnectivityMonitor>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        probe_once(api.as_ref(), &monitor).await;
    }
}
