/// Shared view of how far the local chain is from the best known peer.
///
/// Written by the activities that learn about new heights (block
/// propagation, the downloaders, peer status handling) and read by the
/// synchronizer and the transaction announcement processor. Listeners are
/// only called when the published value actually changes.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use containers::{BlockNumber, SyncStatus};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

pub type SyncStatusListener = Arc<dyn Fn(Option<SyncStatus>) + Send + Sync>;
pub type InSyncListener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default)]
struct ChainHeights {
    local_head: BlockNumber,
    best_peer: Option<BlockNumber>,
    /// Local head at the moment the node last fell out of sync.
    sync_start: Option<BlockNumber>,
}

impl ChainHeights {
    fn is_in_sync(&self, tolerance: u64) -> bool {
        match self.best_peer {
            None => true,
            Some(best) => best.distance_ahead_of(self.local_head) <= tolerance,
        }
    }

    fn sync_status(&self, tolerance: u64) -> Option<SyncStatus> {
        if self.is_in_sync(tolerance) {
            return None;
        }
        let best = self.best_peer?;
        Some(SyncStatus::new(
            self.sync_start.unwrap_or(self.local_head),
            self.local_head,
            best,
        ))
    }

    fn refresh_sync_start(&mut self, tolerance: u64) {
        if self.is_in_sync(tolerance) {
            self.sync_start = None;
        } else if self.sync_start.is_none() {
            self.sync_start = Some(self.local_head);
        }
    }
}

struct InSyncSubscription {
    tolerance: u64,
    in_sync: bool,
    listener: InSyncListener,
}

pub struct SyncState {
    heights: RwLock<ChainHeights>,
    default_tolerance: u64,
    next_subscriber_id: AtomicU64,
    sync_status_listeners: Mutex<HashMap<u64, SyncStatusListener>>,
    in_sync_subscriptions: Mutex<HashMap<u64, InSyncSubscription>>,
    last_published_status: Mutex<Option<SyncStatus>>,
}

impl SyncState {
    pub fn new(default_tolerance: u64) -> Self {
        Self {
            heights: RwLock::new(ChainHeights::default()),
            default_tolerance,
            next_subscriber_id: AtomicU64::new(0),
            sync_status_listeners: Mutex::new(HashMap::new()),
            in_sync_subscriptions: Mutex::new(HashMap::new()),
            last_published_status: Mutex::new(None),
        }
    }

    pub fn default_tolerance(&self) -> u64 {
        self.default_tolerance
    }

    pub fn local_chain_height(&self) -> BlockNumber {
        self.heights.read().local_head
    }

    pub fn best_peer_chain_height(&self) -> Option<BlockNumber> {
        self.heights.read().best_peer
    }

    /// Highest block known anywhere, local or remote.
    pub fn best_chain_height(&self) -> BlockNumber {
        let heights = self.heights.read();
        heights
            .best_peer
            .map_or(heights.local_head, |best| best.max(heights.local_head))
    }

    /// Record a new local chain head.
    pub fn set_local_chain_head(&self, number: BlockNumber) {
        {
            let mut heights = self.heights.write();
            heights.local_head = number;
            heights.refresh_sync_start(self.default_tolerance);
        }
        self.publish();
    }

    /// Record a height reported by a peer. Only higher values are kept.
    ///
    /// Returns true if the best known height moved.
    pub fn update_best_peer_height(&self, number: BlockNumber) -> bool {
        {
            let mut heights = self.heights.write();
            if heights.best_peer.is_some_and(|best| best >= number) {
                return false;
            }
            heights.best_peer = Some(number);
            heights.refresh_sync_start(self.default_tolerance);
        }
        debug!(best_peer_height = number.0, "Best peer chain height updated");
        self.publish();
        true
    }

    pub fn is_in_sync(&self) -> bool {
        self.is_in_sync_with_tolerance(self.default_tolerance)
    }

    /// True when no peer is more than `tolerance` blocks ahead of the local head.
    ///
    /// With no peer information at all the node counts as in sync.
    pub fn is_in_sync_with_tolerance(&self, tolerance: u64) -> bool {
        self.heights.read().is_in_sync(tolerance)
    }

    /// Progress while catching up, `None` once within the default tolerance.
    pub fn sync_status(&self) -> Option<SyncStatus> {
        self.heights.read().sync_status(self.default_tolerance)
    }

    pub fn subscribe_sync_status(&self, listener: SyncStatusListener) -> u64 {
        let id = self.next_id();
        self.sync_status_listeners.lock().insert(id, listener);
        id
    }

    pub fn unsubscribe_sync_status(&self, subscriber_id: u64) -> bool {
        self.sync_status_listeners
            .lock()
            .remove(&subscriber_id)
            .is_some()
    }

    pub fn subscribe_in_sync(&self, listener: InSyncListener) -> u64 {
        self.subscribe_in_sync_with_tolerance(listener, self.default_tolerance)
    }

    /// Subscribe to in-sync flips using a custom tolerance.
    ///
    /// The listener is not called with the current state, only on changes.
    pub fn subscribe_in_sync_with_tolerance(&self, listener: InSyncListener, tolerance: u64) -> u64 {
        let id = self.next_id();
        let subscription = InSyncSubscription {
            tolerance,
            in_sync: self.is_in_sync_with_tolerance(tolerance),
            listener,
        };
        self.in_sync_subscriptions.lock().insert(id, subscription);
        id
    }

    pub fn unsubscribe_in_sync(&self, subscriber_id: u64) -> bool {
        self.in_sync_subscriptions
            .lock()
            .remove(&subscriber_id)
            .is_some()
    }

    fn next_id(&self) -> u64 {
        self.next_subscriber_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Notify listeners whose view changed.
    ///
    /// Listeners are collected under the registry locks and called after the
    /// locks are released, so a listener may (un)subscribe.
    fn publish(&self) {
        // Holding the last published status serializes concurrent publishers.
        let mut last = self.last_published_status.lock();
        let heights = *self.heights.read();

        let status = heights.sync_status(self.default_tolerance);
        let status_notification = if *last == status {
            None
        } else {
            *last = status;
            let listeners: Vec<SyncStatusListener> =
                self.sync_status_listeners.lock().values().cloned().collect();
            Some((status, listeners))
        };

        let in_sync_notifications: Vec<(InSyncListener, bool)> = self
            .in_sync_subscriptions
            .lock()
            .values_mut()
            .filter_map(|subscription| {
                let in_sync = heights.is_in_sync(subscription.tolerance);
                if in_sync == subscription.in_sync {
                    return None;
                }
                subscription.in_sync = in_sync;
                Some((subscription.listener.clone(), in_sync))
            })
            .collect();
        drop(last);

        if let Some((status, listeners)) = status_notification {
            for listener in listeners {
                listener(status);
            }
        }

        for (listener, in_sync) in in_sync_notifications {
            if in_sync {
                info!(local_head = heights.local_head.0, "Node is in sync");
            }
            listener(in_sync);
        }
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(chain::config::DEFAULT_IN_SYNC_TOLERANCE)
    }
}

impl fmt::Debug for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heights = self.heights.read();
        f.debug_struct("SyncState")
            .field("local_head", &heights.local_head)
            .field("best_peer", &heights.best_peer)
            .field("default_tolerance", &self.default_tolerance)
            .finish()
    }
}
