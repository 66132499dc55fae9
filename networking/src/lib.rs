pub mod peers;
pub mod scheduler;
pub mod sync;
pub mod transactions;
pub mod types;

pub use peers::EthPeer;
pub use scheduler::{Scheduler, TokioScheduler};
