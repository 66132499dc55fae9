mod message_tests;
mod peer_tracker_tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use containers::{Hash, Transaction};
use futures::FutureExt;
use futures::future::BoxFuture;
use libp2p_identity::PeerId;
use parking_lot::Mutex;

use crate::peers::EthPeer;
use crate::scheduler::Scheduler;
use crate::types::DisconnectReason;

// Mock peer that serves the transactions it was given and records requests
#[derive(Debug)]
pub(super) struct MockPeer {
    id: PeerId,
    disconnected: AtomicBool,
    fail_requests: AtomicBool,
    transactions: Mutex<HashMap<Hash, Transaction>>,
    requests: Mutex<Vec<Vec<Hash>>>,
    disconnect_reasons: Mutex<Vec<DisconnectReason>>,
}

impl MockPeer {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: PeerId::random(),
            disconnected: AtomicBool::new(false),
            fail_requests: AtomicBool::new(false),
            transactions: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            disconnect_reasons: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn with_transactions(transactions: &[Transaction]) -> Arc<Self> {
        let peer = Self::new();
        peer.transactions
            .lock()
            .extend(transactions.iter().map(|tx| (tx.hash(), tx.clone())));
        peer
    }

    pub(super) fn set_disconnected(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    pub(super) fn fail_requests(&self) {
        self.fail_requests.store(true, Ordering::SeqCst);
    }

    pub(super) fn requests(&self) -> Vec<Vec<Hash>> {
        self.requests.lock().clone()
    }

    pub(super) fn disconnect_reasons(&self) -> Vec<DisconnectReason> {
        self.disconnect_reasons.lock().clone()
    }
}

impl EthPeer for MockPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn disconnect(&self, reason: DisconnectReason) {
        self.disconnect_reasons.lock().push(reason);
        self.disconnected.store(true, Ordering::SeqCst);
    }

    fn get_pooled_transactions(&self, hashes: Vec<Hash>) -> BoxFuture<'static, Result<Vec<Transaction>>> {
        self.requests.lock().push(hashes.clone());
        if self.fail_requests.load(Ordering::SeqCst) {
            return futures::future::ready(Err::<Vec<Transaction>, _>(anyhow!("request timed out"))).boxed();
        }
        let served = self.transactions.lock();
        let response: Vec<Transaction> = hashes
            .iter()
            .filter_map(|hash| served.get(hash).cloned())
            .collect();
        async move { Ok(response) }.boxed()
    }
}

// Scheduler that holds tasks until the test runs them
#[derive(Default)]
pub(super) struct ManualScheduler {
    tasks: Mutex<Vec<(Duration, BoxFuture<'static, ()>)>>,
}

impl ManualScheduler {
    pub(super) fn delays(&self) -> Vec<Duration> {
        self.tasks.lock().iter().map(|(delay, _)| *delay).collect()
    }

    pub(super) fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    pub(super) async fn run_pending(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for (_, task) in tasks {
            task.await;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_future_task(&self, task: BoxFuture<'static, ()>, delay: Duration) {
        self.tasks.lock().push((delay, task));
    }
}

pub(super) fn hash(byte: u8) -> Hash {
    Hash::repeat_byte(byte)
}

// Scheduler that ignores the delay and runs the task before returning
#[derive(Default)]
pub(super) struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn schedule_future_task(&self, task: BoxFuture<'static, ()>, _delay: Duration) {
        futures::executor::block_on(task);
    }
}
