pub mod config;

pub use config::{ConfigError, NodeConfig, SyncMode, SynchronizerConfig, TransactionPoolConfig};
