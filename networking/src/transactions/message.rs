use alloy_primitives::Bytes;
use containers::Hash;

const HASH_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageDecodeError {
    #[error("payload of {length} bytes is not a whole number of 32-byte hashes")]
    TruncatedHash { length: usize },
}

/// Announcement of transactions a peer holds in its pool.
///
/// Carries the payload as received; hashes are decoded on demand so a
/// malformed payload is only detected by the handler that reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPooledTransactionHashesMessage {
    data: Bytes,
}

impl NewPooledTransactionHashesMessage {
    pub fn create(hashes: &[Hash]) -> Self {
        let mut data = Vec::with_capacity(hashes.len() * HASH_LENGTH);
        for hash in hashes {
            data.extend_from_slice(hash.as_slice());
        }
        Self { data: data.into() }
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Announced hashes in message order.
    pub fn pending_transactions(&self) -> Result<Vec<Hash>, MessageDecodeError> {
        if self.data.len() % HASH_LENGTH != 0 {
            return Err(MessageDecodeError::TruncatedHash {
                length: self.data.len(),
            });
        }
        Ok(self
            .data
            .chunks_exact(HASH_LENGTH)
            .map(Hash::from_slice)
            .collect())
    }
}
