use alloy_primitives::Bytes;

use super::hash;
use crate::transactions::{MessageDecodeError, NewPooledTransactionHashesMessage};

#[test]
fn test_hashes_decode_in_announced_order() {
    let message = NewPooledTransactionHashesMessage::create(&[hash(3), hash(1), hash(2)]);

    assert_eq!(message.data().len(), 96);
    assert_eq!(
        message.pending_transactions().unwrap(),
        vec![hash(3), hash(1), hash(2)]
    );
}

#[test]
fn test_empty_announcement_is_valid() {
    let message = NewPooledTransactionHashesMessage::from_bytes(Bytes::new());
    assert!(message.pending_transactions().unwrap().is_empty());
}

#[test]
fn test_truncated_hash_is_rejected() {
    let message = NewPooledTransactionHashesMessage::from_bytes(vec![0u8; 33]);

    assert_eq!(
        message.pending_transactions(),
        Err(MessageDecodeError::TruncatedHash { length: 33 })
    );
}
