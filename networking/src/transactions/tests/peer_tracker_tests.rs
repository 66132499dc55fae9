use std::num::NonZeroUsize;

use containers::Transaction;
use pretty_assertions::assert_eq;
use libp2p_identity::PeerId;

use super::hash;
use crate::transactions::PeerTransactionTracker;

#[test]
fn test_marking_is_per_peer() {
    let tracker = PeerTransactionTracker::new();
    let peer_a = PeerId::random();
    let peer_b = PeerId::random();

    tracker.mark_transaction_hashes_as_seen(peer_a, &[hash(1), hash(2)]);

    assert!(tracker.has_peer_seen_transaction(&peer_a, &hash(1)));
    assert!(tracker.has_peer_seen_transaction(&peer_a, &hash(2)));
    assert!(!tracker.has_peer_seen_transaction(&peer_b, &hash(1)));
}

#[test]
fn test_marking_twice_is_idempotent() {
    let tracker = PeerTransactionTracker::new();
    let peer = PeerId::random();

    tracker.mark_transaction_hashes_as_seen(peer, &[hash(1), hash(2)]);
    tracker.mark_transaction_hashes_as_seen(peer, &[hash(2), hash(1)]);

    assert_eq!(tracker.seen_transaction_count(&peer), 2);
}

#[test]
fn test_oldest_hashes_are_forgotten_at_capacity() {
    let tracker = PeerTransactionTracker::with_capacity(NonZeroUsize::new(2).unwrap());
    let peer = PeerId::random();

    tracker.mark_transaction_hashes_as_seen(peer, &[hash(1), hash(2), hash(3)]);

    assert_eq!(tracker.seen_transaction_count(&peer), 2);
    assert!(!tracker.has_peer_seen_transaction(&peer, &hash(1)));
    assert!(tracker.has_peer_seen_transaction(&peer, &hash(3)));
}

#[test]
fn test_full_transactions_are_marked_by_hash() {
    let tracker = PeerTransactionTracker::new();
    let peer = PeerId::random();
    let transaction = Transaction::new(7, vec![0xaa]);

    tracker.mark_transactions_as_seen(peer, std::slice::from_ref(&transaction));

    assert!(tracker.has_peer_seen_transaction(&peer, &transaction.hash()));
}

#[test]
fn test_disconnect_forgets_peer() {
    let tracker = PeerTransactionTracker::new();
    let peer = PeerId::random();
    tracker.mark_transaction_hashes_as_seen(peer, &[hash(1)]);

    tracker.on_disconnect(&peer);

    assert_eq!(tracker.seen_transaction_count(&peer), 0);
    assert!(!tracker.has_peer_seen_transaction(&peer, &hash(1)));
}
