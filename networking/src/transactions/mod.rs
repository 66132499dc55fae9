/// Transaction gossip intake.
///
/// Peers announce new transactions by hash. Instead of asking for every
/// hash as it arrives, announcements are collected per peer for a short
/// buffering period and then fetched with one request:
///
/// 1. Expired messages are dropped and counted
/// 2. Announced hashes are recorded as seen for the sending peer
/// 3. While the node is catching up, nothing else happens
/// 4. Hashes not in the pool go into the peer's buffer; the first one
///    schedules the flush
/// 5. The flush detaches the buffer and requests all of it at once
pub mod buffered_fetcher;
pub mod config;
pub mod message;
pub mod peer_tracker;
pub mod pool;
pub mod processor;

pub use buffered_fetcher::BufferedGetPooledTransactionsFromPeerFetcher;
pub use config::*;
pub use message::{MessageDecodeError, NewPooledTransactionHashesMessage};
pub use peer_tracker::PeerTransactionTracker;
pub use pool::{InMemoryTransactionPool, TransactionPool};
pub use processor::NewPooledTransactionHashesProcessor;

#[cfg(test)]
mod tests;
