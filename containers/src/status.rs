use crate::BlockNumber;
use serde::{Deserialize, Serialize};

/// Progress report published while the local chain is catching up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Local head when the current catch-up began.
    pub starting_block: BlockNumber,
    /// Local head now.
    pub current_block: BlockNumber,
    /// Best chain height reported by any peer.
    pub highest_block: BlockNumber,
}

impl SyncStatus {
    pub fn new(
        starting_block: BlockNumber,
        current_block: BlockNumber,
        highest_block: BlockNumber,
    ) -> Self {
        Self {
            starting_block,
            current_block,
            highest_block,
        }
    }

    /// Blocks still missing to reach the best known height.
    pub fn blocks_behind(&self) -> u64 {
        self.highest_block.distance_ahead_of(self.current_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blocks_behind() {
        let status = SyncStatus::new(BlockNumber(10), BlockNumber(40), BlockNumber(100));
        assert_eq!(status.blocks_behind(), 60);
    }
}
