pub mod block;
pub mod status;
pub mod transaction;
pub mod types;

pub use block::BlockHeader;
pub use status::SyncStatus;
pub use transaction::Transaction;
pub use types::{BlockNumber, Hash};
pub use alloy_primitives;
