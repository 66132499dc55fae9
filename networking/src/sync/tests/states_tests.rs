use crate::sync::SyncPhase;

#[test]
fn test_default_phase_is_stopped() {
    assert_eq!(SyncPhase::default(), SyncPhase::Stopped);
    assert!(!SyncPhase::default().is_running());
}

#[test]
fn test_stopped_only_starts() {
    assert!(SyncPhase::Stopped.can_transition_to(SyncPhase::Starting));
    assert!(!SyncPhase::Stopped.can_transition_to(SyncPhase::FastSyncing));
    assert!(!SyncPhase::Stopped.can_transition_to(SyncPhase::FullSyncing));
    assert!(!SyncPhase::Stopped.can_transition_to(SyncPhase::Stopped));
}

#[test]
fn test_starting_chooses_mode_or_stops() {
    assert!(SyncPhase::Starting.can_transition_to(SyncPhase::FastSyncing));
    assert!(SyncPhase::Starting.can_transition_to(SyncPhase::FullSyncing));
    assert!(SyncPhase::Starting.can_transition_to(SyncPhase::Stopped));
}

#[test]
fn test_fast_sync_hands_over_to_full_sync() {
    assert!(SyncPhase::FastSyncing.can_transition_to(SyncPhase::FullSyncing));
    assert!(SyncPhase::FastSyncing.can_transition_to(SyncPhase::Stopped));
    assert!(!SyncPhase::FullSyncing.can_transition_to(SyncPhase::FastSyncing));
}

#[test]
fn test_full_sync_only_stops() {
    assert!(SyncPhase::FullSyncing.can_transition_to(SyncPhase::Stopped));
    assert!(!SyncPhase::FullSyncing.can_transition_to(SyncPhase::Starting));
}
