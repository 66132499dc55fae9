use crate::{BlockNumber, Hash};
use alloy_primitives::keccak256;
use serde::{Deserialize, Serialize};

/// Header of a block, the only part of a block the sync core ever handles.
///
/// A fast sync run anchors on one of these (the pivot) and hands it over to
/// the world-state archive once the state below it has been downloaded.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub number: BlockNumber,
    pub parent_hash: Hash,
    pub state_root: Hash,
}

impl BlockHeader {
    pub fn new(number: BlockNumber, parent_hash: Hash, state_root: Hash) -> Self {
        Self {
            number,
            parent_hash,
            state_root,
        }
    }

    /// Hash of the header fields.
    pub fn hash(&self) -> Hash {
        let mut preimage = Vec::with_capacity(8 + 32 + 32);
        preimage.extend_from_slice(&self.number.0.to_be_bytes());
        preimage.extend_from_slice(self.parent_hash.as_slice());
        preimage.extend_from_slice(self.state_root.as_slice());
        keccak256(preimage)
    }

    /// Build the child of this header with the given state root.
    pub fn child(&self, state_root: Hash) -> Self {
        Self::new(self.number.next(), self.hash(), state_root)
    }
}
