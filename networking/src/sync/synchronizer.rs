use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use anyhow::{Result, anyhow};
use containers::SyncStatus;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use metrics::Metrics;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
/// Synchronizer lifecycle controller.
///
/// Composes block propagation, an optional fast sync, full sync and an
/// optional pruner into one start/stop lifecycle:
///
/// 1. `start` starts block propagation, then fast sync if configured,
///    otherwise full sync.
/// 2. When fast sync completes, its pivot state is adopted and full sync
///    (together with the pruner) takes over.
/// 3. When the chain completes, or `stop` is called, everything is stopped
///    and the synchronizer returns to `Stopped`.
use tracing::{debug, info, warn};

use super::{
    activities::{
        BlockPropagation, FastSyncDownloader, FastSyncState, FullSyncDownloader, Pruner,
        WorldStateArchive,
    },
    states::SyncPhase,
    sync_state::{InSyncListener, SyncState, SyncStatusListener},
    trailing_peers::TrailingPeerRequirements,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynchronizerError {
    #[error("attempt to start an already started synchronizer")]
    AlreadyStarted,
    #[error("previous run is still starting its activities")]
    PreviousRunStarting,
}

/// Activities composed by the synchronizer.
///
/// `fast_sync` and `pruner` are only present when the node is configured for
/// them.
pub struct SyncActivities {
    pub block_propagation: Arc<dyn BlockPropagation>,
    pub fast_sync: Option<Arc<dyn FastSyncDownloader>>,
    pub full_sync: Arc<dyn FullSyncDownloader>,
    pub pruner: Option<Arc<dyn Pruner>>,
    pub world_state: Arc<dyn WorldStateArchive>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    BlockPropagation,
    FastSync,
    FullSync,
    Pruner,
}

/// Producers first, then the work depending on them.
const STOP_ORDER: [Activity; 4] = [
    Activity::FastSync,
    Activity::FullSync,
    Activity::BlockPropagation,
    Activity::Pruner,
];

/// State guarded by the lifecycle lock.
///
/// Collaborators are never called while it is held, so listeners and
/// activities may call back into the synchronizer.
#[derive(Debug, Default)]
struct Lifecycle {
    phase: SyncPhase,
    /// Incremented by every accepted `start`.
    run: u64,
    /// Activities of the current run whose `start` has returned.
    running: Vec<Activity>,
    /// Collaborator `start` calls in progress.
    starting: usize,
}

impl Lifecycle {
    fn transition(&mut self, target: SyncPhase) -> bool {
        if !self.phase.can_transition_to(target) {
            warn!(
                from = ?self.phase,
                to = ?target,
                "Invalid synchronizer transition attempted"
            );
            return false;
        }
        debug!(from = ?self.phase, to = ?target, run = self.run, "Synchronizer transition");
        self.phase = target;
        true
    }

    fn is_current(&self, run: u64) -> bool {
        self.run == run && self.phase.is_running()
    }

    /// Move to `Stopped` and hand out the activities left to stop.
    fn stop(&mut self) -> Vec<Activity> {
        self.transition(SyncPhase::Stopped);
        std::mem::take(&mut self.running)
    }
}

pub struct Synchronizer {
    lifecycle: Mutex<Lifecycle>,
    sync_state: Arc<SyncState>,
    block_propagation: Arc<dyn BlockPropagation>,
    fast_sync: Option<Arc<dyn FastSyncDownloader>>,
    full_sync: Arc<dyn FullSyncDownloader>,
    pruner: Option<Arc<dyn Pruner>>,
    world_state: Arc<dyn WorldStateArchive>,
}

impl Synchronizer {
    /// Build a stopped synchronizer and register its gauges on `metrics`.
    pub fn new(
        activities: SyncActivities,
        sync_state: Arc<SyncState>,
        metrics: &Metrics,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            Self::register_metrics(weak.clone(), &sync_state, metrics);

            Self {
                lifecycle: Mutex::new(Lifecycle::default()),
                sync_state,
                block_propagation: activities.block_propagation,
                fast_sync: activities.fast_sync,
                full_sync: activities.full_sync,
                pruner: activities.pruner,
                world_state: activities.world_state,
            }
        })
    }

    fn register_metrics(synchronizer: Weak<Self>, sync_state: &Arc<SyncState>, metrics: &Metrics) {
        let state = Arc::downgrade(sync_state);
        let best_known = metrics.register_gauge_fn(
            "ethereum_best_known_block_number",
            "The estimated highest block available",
            move || {
                state
                    .upgrade()
                    .map_or(0, |state| i64::try_from(state.best_chain_height().0).unwrap_or(i64::MAX))
            },
        );
        let in_sync = metrics.register_gauge_fn(
            "synchronizer_in_sync",
            "Whether or not the local node has caught up to the best known peer",
            move || {
                synchronizer
                    .upgrade()
                    .map_or(1, |synchronizer| i64::from(synchronizer.get_sync_status().is_none()))
            },
        );

        for result in [best_known, in_sync] {
            if let Err(err) = result {
                warn!(%err, "Failed to register synchronizer gauge");
            }
        }
    }

    /// Start synchronizing.
    ///
    /// Returns a handle that resolves once the chain of activities completes,
    /// or fails with the error of the activity that failed. Must be called
    /// from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<SyncCompletion, SynchronizerError> {
        let run = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.phase.is_running() {
                return Err(SynchronizerError::AlreadyStarted);
            }
            if lifecycle.starting > 0 {
                return Err(SynchronizerError::PreviousRunStarting);
            }
            lifecycle.run += 1;
            lifecycle.transition(SyncPhase::Starting);
            lifecycle.run
        };
        info!(run, "Starting synchronizer");

        // Armed before any collaborator runs, so a panicking start still finalizes.
        let finalizer = FinalizeOnDrop {
            synchronizer: Arc::clone(self),
            run,
        };

        self.start_activity(run, Activity::BlockPropagation, || {
            self.block_propagation.start()
        });

        let sync: BoxFuture<'static, Result<()>> = match &self.fast_sync {
            Some(fast_sync) => {
                self.enter_phase(run, SyncPhase::FastSyncing);
                match self.start_activity(run, Activity::FastSync, || fast_sync.start()) {
                    Some(fast_sync_result) => {
                        let synchronizer = Arc::clone(self);
                        async move {
                            let result = fast_sync_result.await;
                            synchronizer.handle_fast_sync_result(run, result).await
                        }
                        .boxed()
                    }
                    None => future::ok(()).boxed(),
                }
            }
            None => {
                self.enter_phase(run, SyncPhase::FullSyncing);
                self.start_full_sync(run)
            }
        };

        let handle = tokio::spawn(async move {
            let _finalizer = finalizer;
            let result = sync.await;
            if let Err(err) = &result {
                warn!(run, %err, "Synchronizer stopped by a failed sync activity");
            }
            result
        });

        Ok(SyncCompletion { handle })
    }

    /// Stop all activities. Does nothing when not running.
    pub fn stop(&self) {
        let (run, running) = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.phase.is_running() {
                return;
            }
            (lifecycle.run, lifecycle.stop())
        };
        info!(run, "Stopping synchronizer");

        for activity in STOP_ORDER {
            if running.contains(&activity) {
                self.stop_activity(activity);
            }
        }
    }

    /// Wait for background work to wind down after `stop`.
    pub async fn await_stop(&self) -> Result<()> {
        if let Some(pruner) = &self.pruner {
            pruner.await_stop().await?;
        }
        Ok(())
    }

    pub fn phase(&self) -> SyncPhase {
        self.lifecycle.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase().is_running()
    }

    /// Sync progress, `None` when stopped or already in sync.
    pub fn get_sync_status(&self) -> Option<SyncStatus> {
        if !self.is_running() {
            return None;
        }
        self.sync_state.sync_status()
    }

    pub fn subscribe_sync_status(&self, listener: SyncStatusListener) -> u64 {
        self.sync_state.subscribe_sync_status(listener)
    }

    pub fn unsubscribe_sync_status(&self, subscriber_id: u64) -> bool {
        self.sync_state.unsubscribe_sync_status(subscriber_id)
    }

    pub fn subscribe_in_sync(&self, listener: InSyncListener) -> u64 {
        self.sync_state.subscribe_in_sync(listener)
    }

    pub fn subscribe_in_sync_with_tolerance(&self, listener: InSyncListener, tolerance: u64) -> u64 {
        self.sync_state
            .subscribe_in_sync_with_tolerance(listener, tolerance)
    }

    pub fn unsubscribe_in_sync(&self, subscriber_id: u64) -> bool {
        self.sync_state.unsubscribe_in_sync(subscriber_id)
    }

    /// Trailing peer policy of the active sync mode.
    pub fn calculate_trailing_peer_requirements(&self) -> TrailingPeerRequirements {
        self.fast_sync
            .as_ref()
            .and_then(|fast_sync| fast_sync.calculate_trailing_peer_requirements())
            .unwrap_or_else(|| self.full_sync.calculate_trailing_peer_requirements())
    }

    async fn handle_fast_sync_result(&self, run: u64, result: Result<FastSyncState>) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.run != run || lifecycle.phase != SyncPhase::FastSyncing {
                // Stopping fast sync is what completed it; there is nothing to hand over.
                debug!(run, "Skipping full sync, synchronizer was stopped");
                return Ok(());
            }
            lifecycle
                .running
                .retain(|activity| *activity != Activity::FastSync);
        }
        let result = result?;

        if let Some(fast_sync) = &self.fast_sync {
            fast_sync.delete_fast_sync_state();
        }
        if let Some(pivot) = result.pivot_block_header() {
            self.world_state.set_archive_state_unsafe(pivot);
        }
        info!(
            pivot_block = ?result.pivot_block_number().map(|number| number.0),
            "Fast sync completed successfully"
        );

        if !self.enter_phase(run, SyncPhase::FullSyncing) {
            debug!(run, "Skipping full sync, synchronizer was stopped");
            return Ok(());
        }
        self.start_full_sync(run).await
    }

    fn start_full_sync(&self, run: u64) -> BoxFuture<'static, Result<()>> {
        if let Some(pruner) = &self.pruner {
            self.start_activity(run, Activity::Pruner, || pruner.start());
        }
        self.start_activity(run, Activity::FullSync, || self.full_sync.start())
            .unwrap_or_else(|| future::ok(()).boxed())
    }

    /// Transition `run` to `phase`. False when the run was stopped.
    fn enter_phase(&self, run: u64, phase: SyncPhase) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.is_current(run) && lifecycle.transition(phase)
    }

    /// Run a collaborator `start` without holding the lifecycle lock.
    ///
    /// `None` when `run` is no longer current, either before the call or by the
    /// time it returns. In the second case `stop` could not see the activity,
    /// so it is stopped here.
    fn start_activity<T>(&self, run: u64, activity: Activity, start: impl FnOnce() -> T) -> Option<T> {
        let in_flight = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.is_current(run) {
                return None;
            }
            lifecycle.starting += 1;
            StartInFlight {
                lifecycle: &self.lifecycle,
                finished: false,
            }
        };

        let started = start();

        if !in_flight.finish(run, activity) {
            debug!(run, ?activity, "Synchronizer stopped while starting activity");
            self.stop_activity(activity);
            return None;
        }
        Some(started)
    }

    fn stop_activity(&self, activity: Activity) {
        match activity {
            Activity::BlockPropagation => self.block_propagation.stop(),
            Activity::FastSync => {
                if let Some(fast_sync) = &self.fast_sync {
                    fast_sync.stop();
                }
            }
            Activity::FullSync => self.full_sync.stop(),
            Activity::Pruner => {
                if let Some(pruner) = &self.pruner {
                    pruner.stop();
                }
            }
        }
    }

    /// Runs when the task started by `start` ends, whichever way it ends.
    fn finalize_sync(&self, run: u64) {
        let running = {
            let mut lifecycle = self.lifecycle.lock();
            // Either stopped already, or a newer run owns the activities.
            if !lifecycle.is_current(run) {
                return;
            }
            lifecycle.stop()
        };

        // The sync activities have completed; only the long-lived ones remain.
        if running.contains(&Activity::BlockPropagation) {
            info!(run, "Stopping block propagation");
            self.stop_activity(Activity::BlockPropagation);
        }
        if running.contains(&Activity::Pruner) {
            info!(run, "Stopping the pruner");
            self.stop_activity(Activity::Pruner);
        }
    }
}

/// Counts a collaborator `start` in progress, also when it panics.
struct StartInFlight<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
    finished: bool,
}

impl StartInFlight<'_> {
    /// Record `activity` as running. False when `run` was stopped meanwhile.
    fn finish(mut self, run: u64, activity: Activity) -> bool {
        self.finished = true;
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.starting -= 1;
        if !lifecycle.is_current(run) {
            return false;
        }
        lifecycle.running.push(activity);
        true
    }
}

impl Drop for StartInFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.lifecycle.lock().starting -= 1;
        }
    }
}

struct FinalizeOnDrop {
    synchronizer: Arc<Synchronizer>,
    run: u64,
}

impl Drop for FinalizeOnDrop {
    fn drop(&mut self) {
        self.synchronizer.finalize_sync(self.run);
    }
}

/// Completion of one synchronizer run.
///
/// Dropping it does not stop the run.
#[derive(Debug)]
pub struct SyncCompletion {
    handle: JoinHandle<Result<()>>,
}

impl Future for SyncCompletion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| {
            joined
                .map_err(|err| anyhow!("synchronizer task failed: {err}"))
                .and_then(|result| result)
        })
    }
}
