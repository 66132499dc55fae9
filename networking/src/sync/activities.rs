/// Long-running activities the synchronizer composes.
///
/// Their download, verification and retry logic lives elsewhere. The
/// synchronizer only decides when each of them runs. `start` methods kick the
/// work off before returning; the returned future resolves when the activity
/// completes on its own or after `stop`.
use anyhow::Result;
use async_trait::async_trait;
use containers::{BlockHeader, BlockNumber};
use futures::future::BoxFuture;

use super::trailing_peers::TrailingPeerRequirements;

/// Outcome of a completed fast sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastSyncState {
    pivot_block_header: Option<BlockHeader>,
}

impl FastSyncState {
    pub fn new(pivot_block_header: Option<BlockHeader>) -> Self {
        Self { pivot_block_header }
    }

    pub fn with_pivot(pivot_block_header: BlockHeader) -> Self {
        Self::new(Some(pivot_block_header))
    }

    pub fn pivot_block_header(&self) -> Option<&BlockHeader> {
        self.pivot_block_header.as_ref()
    }

    pub fn pivot_block_number(&self) -> Option<BlockNumber> {
        self.pivot_block_header.as_ref().map(|header| header.number)
    }
}

pub trait FastSyncDownloader: Send + Sync {
    fn start(&self) -> BoxFuture<'static, Result<FastSyncState>>;

    fn stop(&self);

    /// Remove the persisted resumption state of an interrupted run.
    fn delete_fast_sync_state(&self);

    /// `None` when fast sync has no opinion, e.g. once it has finished.
    fn calculate_trailing_peer_requirements(&self) -> Option<TrailingPeerRequirements>;
}

pub trait FullSyncDownloader: Send + Sync {
    fn start(&self) -> BoxFuture<'static, Result<()>>;

    fn stop(&self);

    fn calculate_trailing_peer_requirements(&self) -> TrailingPeerRequirements;
}

/// Relays newly received blocks to peers.
pub trait BlockPropagation: Send + Sync {
    fn start(&self);

    fn stop(&self);
}

#[async_trait]
pub trait Pruner: Send + Sync {
    fn start(&self);

    fn stop(&self);

    /// Wait until a stopped pruner has finished its current pass.
    async fn await_stop(&self) -> Result<()>;
}

pub trait WorldStateArchive: Send + Sync {
    /// Adopt the state below `header` without validating it.
    ///
    /// Only used with a fast sync pivot, whose state was verified against the
    /// pivot's state root while it was downloaded.
    fn set_archive_state_unsafe(&self, header: &BlockHeader);
}
