use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use containers::{BlockNumber, SyncStatus};
use pretty_assertions::assert_eq;
use parking_lot::Mutex;

use crate::sync::{InSyncListener, SyncState, SyncStatusListener};

fn recording_in_sync_listener() -> (InSyncListener, Arc<Mutex<Vec<bool>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();
    let listener: InSyncListener = Arc::new(move |in_sync| recorded.lock().push(in_sync));
    (listener, events)
}

fn recording_status_listener() -> (SyncStatusListener, Arc<Mutex<Vec<Option<SyncStatus>>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();
    let listener: SyncStatusListener = Arc::new(move |status| recorded.lock().push(status));
    (listener, events)
}

#[test]
fn test_in_sync_without_peer_information() {
    let state = SyncState::new(5);

    assert!(state.is_in_sync());
    assert_eq!(state.sync_status(), None);
    assert_eq!(state.best_chain_height(), BlockNumber(0));
}

#[test]
fn test_tolerance_boundary() {
    let state = SyncState::new(5);
    state.update_best_peer_height(BlockNumber(15));

    state.set_local_chain_head(BlockNumber(9));
    assert!(!state.is_in_sync());

    state.set_local_chain_head(BlockNumber(10));
    assert!(state.is_in_sync());
    assert!(!state.is_in_sync_with_tolerance(4));
}

#[test]
fn test_best_peer_height_only_increases() {
    let state = SyncState::new(5);

    assert!(state.update_best_peer_height(BlockNumber(100)));
    assert!(!state.update_best_peer_height(BlockNumber(90)));
    assert!(!state.update_best_peer_height(BlockNumber(100)));

    assert_eq!(state.best_peer_chain_height(), Some(BlockNumber(100)));
}

#[test]
fn test_best_chain_height_includes_local_head() {
    let state = SyncState::new(5);
    state.update_best_peer_height(BlockNumber(10));
    state.set_local_chain_head(BlockNumber(12));

    assert_eq!(state.best_chain_height(), BlockNumber(12));
}

#[test]
fn test_sync_status_keeps_starting_block() {
    let state = SyncState::new(5);
    state.set_local_chain_head(BlockNumber(10));
    state.update_best_peer_height(BlockNumber(100));
    state.set_local_chain_head(BlockNumber(40));

    assert_eq!(
        state.sync_status(),
        Some(SyncStatus::new(BlockNumber(10), BlockNumber(40), BlockNumber(100)))
    );
}

#[test]
fn test_status_listener_called_on_change_only() {
    let state = SyncState::new(5);
    let (listener, events) = recording_status_listener();
    state.subscribe_sync_status(listener);

    state.update_best_peer_height(BlockNumber(100));
    state.set_local_chain_head(BlockNumber(50));
    state.set_local_chain_head(BlockNumber(50));
    state.set_local_chain_head(BlockNumber(100));

    let events = events.lock();
    assert_eq!(
        *events,
        vec![
            Some(SyncStatus::new(BlockNumber(0), BlockNumber(0), BlockNumber(100))),
            Some(SyncStatus::new(BlockNumber(0), BlockNumber(50), BlockNumber(100))),
            None,
        ]
    );
}

#[test]
fn test_in_sync_listener_called_on_flip_only() {
    let state = SyncState::new(5);
    let (listener, events) = recording_in_sync_listener();
    state.subscribe_in_sync(listener);

    state.update_best_peer_height(BlockNumber(100));
    state.set_local_chain_head(BlockNumber(20));
    state.set_local_chain_head(BlockNumber(97));
    state.set_local_chain_head(BlockNumber(99));

    assert_eq!(*events.lock(), vec![false, true]);
}

#[test]
fn test_in_sync_listener_with_custom_tolerance() {
    let state = SyncState::new(5);
    let (listener, events) = recording_in_sync_listener();
    state.subscribe_in_sync_with_tolerance(listener, 100);

    state.update_best_peer_height(BlockNumber(50));
    assert!(events.lock().is_empty());

    state.update_best_peer_height(BlockNumber(101));
    assert_eq!(*events.lock(), vec![false]);
}

#[test]
fn test_unsubscribed_listeners_are_not_called() {
    let state = SyncState::new(5);
    let (in_sync_listener, in_sync_events) = recording_in_sync_listener();
    let (status_listener, status_events) = recording_status_listener();
    let in_sync_id = state.subscribe_in_sync(in_sync_listener);
    let status_id = state.subscribe_sync_status(status_listener);

    assert!(state.unsubscribe_in_sync(in_sync_id));
    assert!(state.unsubscribe_sync_status(status_id));
    assert!(!state.unsubscribe_in_sync(in_sync_id));

    state.update_best_peer_height(BlockNumber(100));

    assert!(in_sync_events.lock().is_empty());
    assert!(status_events.lock().is_empty());
}

#[test]
fn test_listener_may_unsubscribe_itself() {
    let state = Arc::new(SyncState::new(5));
    let calls = Arc::new(AtomicUsize::new(0));
    let subscriber_id = Arc::new(Mutex::new(None));

    let listener_state = Arc::downgrade(&state);
    let listener_calls = calls.clone();
    let listener_id = subscriber_id.clone();
    let listener: InSyncListener = Arc::new(move |_| {
        listener_calls.fetch_add(1, Ordering::SeqCst);
        if let (Some(state), Some(id)) = (listener_state.upgrade(), *listener_id.lock()) {
            state.unsubscribe_in_sync(id);
        }
    });
    *subscriber_id.lock() = Some(state.subscribe_in_sync(listener));

    state.update_best_peer_height(BlockNumber(100));
    state.set_local_chain_head(BlockNumber(100));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
