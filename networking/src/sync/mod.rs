/// Synchronizer for an eth execution node.
///
/// Drives the local chain towards the network head. The download algorithms
/// themselves live in the activities this module composes:
///
/// - **SyncState**: best known peer height, in-sync tracking and listeners
/// - **Activities**: fast sync, full sync, block propagation and pruner seams
/// - **Synchronizer**: runs the activities as one start/stop lifecycle
///
/// ## State Machine
///
/// - **STOPPED**: not running
/// - **STARTING**: block propagation started, sync mode being chosen
/// - **FAST_SYNCING**: downloading state at a pivot block (optional)
/// - **FULL_SYNCING**: following the chain block by block
pub mod activities;
pub mod states;
pub mod sync_state;
pub mod synchronizer;
pub mod trailing_peers;

pub use activities::{
    BlockPropagation, FastSyncDownloader, FastSyncState, FullSyncDownloader, Pruner,
    WorldStateArchive,
};
pub use states::SyncPhase;
pub use sync_state::{InSyncListener, SyncState, SyncStatusListener};
pub use synchronizer::{SyncActivities, SyncCompletion, Synchronizer, SynchronizerError};
pub use trailing_peers::TrailingPeerRequirements;

#[cfg(test)]
mod tests;
