/// Synchronizer lifecycle state machine.
///
/// ```text
/// Stopped -> Starting -> FastSyncing -> FullSyncing -> Stopped
///                    \-> FullSyncing -------------/
/// ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Not running. Initial and terminal state.
    #[default]
    Stopped,

    /// `start` accepted; propagation is being started and the sync mode chosen.
    Starting,

    /// Bulk catch-up towards a pivot block. Only entered when a fast sync
    /// downloader is configured.
    FastSyncing,

    /// Following the chain block by block. Runs until stopped or until the
    /// downloader completes on its own.
    FullSyncing,
}

impl SyncPhase {
    /// Check if a transition to the target phase is valid.
    pub fn can_transition_to(&self, target: SyncPhase) -> bool {
        match self {
            SyncPhase::Stopped => matches!(target, SyncPhase::Starting),
            SyncPhase::Starting => matches!(
                target,
                SyncPhase::FastSyncing | SyncPhase::FullSyncing | SyncPhase::Stopped
            ),
            SyncPhase::FastSyncing => {
                matches!(target, SyncPhase::FullSyncing | SyncPhase::Stopped)
            }
            SyncPhase::FullSyncing => matches!(target, SyncPhase::Stopped),
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self, SyncPhase::Stopped)
    }
}
