use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// 32-byte hash identifying blocks and transactions.
pub type Hash = B256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockNumber(pub u64);

impl PartialOrd for BlockNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BlockNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl BlockNumber {
    pub const GENESIS: BlockNumber = BlockNumber(0);

    /// Number of blocks `self` is ahead of `other`, zero when it is not ahead.
    pub fn distance_ahead_of(self, other: BlockNumber) -> u64 {
        self.0.saturating_sub(other.0)
    }

    pub fn next(self) -> BlockNumber {
        BlockNumber(self.0.saturating_add(1))
    }
}

impl From<u64> for BlockNumber {
    fn from(value: u64) -> Self {
        BlockNumber(value)
    }
}

impl FromStr for BlockNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(BlockNumber)
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
