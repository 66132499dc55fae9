use crate::Hash;
use alloy_primitives::{keccak256, Bytes};
use serde::{Deserialize, Serialize};

/// A pending transaction as held by the local pool.
///
/// The payload is opaque to the sync core. Its hash is what peers announce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    hash: Hash,
    pub nonce: u64,
    pub payload: Bytes,
}

impl Transaction {
    pub fn new(nonce: u64, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let mut preimage = Vec::with_capacity(8 + payload.len());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(&payload);
        Self {
            hash: keccak256(preimage),
            nonce,
            payload,
        }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn test_hash_depends_on_nonce_and_payload() {
        let a = Transaction::new(1, vec![1, 2, 3]);
        let b = Transaction::new(2, vec![1, 2, 3]);
        let c = Transaction::new(1, vec![1, 2, 3]);

        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), c.hash());
    }
}
