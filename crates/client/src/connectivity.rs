// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! The host platform feeds online/offline signals into
//! [`ConnectivityMonitor::set_online`]; everything else in the layer reads
//! connectivity only through this type, so tests can simulate transitions.

use tokio::sync::watch;

/// Tracks the online/offline state and fans out transitions to subscribers.
pub struct ConnectivityMonitor {
    online: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (online, _) = watch::channel(initially_online);
        Self { online }
    }

    /// Point-in-time connectivity.
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Record a platform connectivity signal.
    ///
    /// Duplicate signals (online while already online) are dropped so
    /// subscribers only wake on real transitions.
    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
    }

    /// Subscribe to connectivity transitions. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
