use containers::BlockNumber;

/// How many peers behind the local head the peer manager should keep, and
/// how far behind they may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingPeerRequirements {
    pub minimum_height_to_be_up_to_date: BlockNumber,
    pub max_trailing_peers: u64,
}

impl TrailingPeerRequirements {
    /// No trailing peers are needed.
    pub const UNRESTRICTED: TrailingPeerRequirements = TrailingPeerRequirements {
        minimum_height_to_be_up_to_date: BlockNumber::GENESIS,
        max_trailing_peers: u64::MAX,
    };

    pub fn new(minimum_height_to_be_up_to_date: BlockNumber, max_trailing_peers: u64) -> Self {
        Self {
            minimum_height_to_be_up_to_date,
            max_trailing_peers,
        }
    }

    /// Whether a peer at `peer_height` counts as trailing.
    pub fn is_trailing(&self, peer_height: BlockNumber) -> bool {
        peer_height < self.minimum_height_to_be_up_to_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_never_trails() {
        assert!(!TrailingPeerRequirements::UNRESTRICTED.is_trailing(BlockNumber(0)));
    }

    #[test]
    fn test_peer_below_minimum_is_trailing() {
        let requirements = TrailingPeerRequirements::new(BlockNumber(100), 2);
        assert!(requirements.is_trailing(BlockNumber(99)));
        assert!(!requirements.is_trailing(BlockNumber(100)));
    }
}
