use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Blocks a node may trail the best known peer and still count as in sync.
pub const DEFAULT_IN_SYNC_TOLERANCE: u64 = 5;

/// Tolerance used to gate transaction gossip. Wider than the in-sync default
/// so short hiccups do not stop transaction intake.
pub const TRANSACTION_GOSSIP_SYNC_TOLERANCE: u64 = 100;

pub const ANNOUNCED_BUFFERING_PERIOD_MS: u64 = 500;
pub const TRANSACTIONS_MESSAGE_KEEP_ALIVE_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Replay every block from the local head.
    #[default]
    Full,
    /// Download state at a pivot block first, then follow block by block.
    Fast,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SynchronizerConfig {
    pub sync_mode: SyncMode,
    pub in_sync_tolerance: u64,
    pub pruning_enabled: bool,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Full,
            in_sync_tolerance: DEFAULT_IN_SYNC_TOLERANCE,
            pruning_enabled: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransactionPoolConfig {
    /// Debounce window for announced transaction hashes, per peer.
    #[serde(with = "duration_millis")]
    pub announced_buffering_period: Duration,
    /// How long an inbound transaction message may wait in the queue.
    #[serde(with = "duration_millis")]
    pub transactions_message_keep_alive: Duration,
    pub sync_tolerance: u64,
}

impl Default for TransactionPoolConfig {
    fn default() -> Self {
        Self {
            announced_buffering_period: Duration::from_millis(ANNOUNCED_BUFFERING_PERIOD_MS),
            transactions_message_keep_alive: Duration::from_secs(
                TRANSACTIONS_MESSAGE_KEEP_ALIVE_SECS,
            ),
            sync_tolerance: TRANSACTION_GOSSIP_SYNC_TOLERANCE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NodeConfig {
    pub synchronizer: SynchronizerConfig,
    pub transaction_pool: TransactionPoolConfig,
}

impl NodeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
