use std::collections::HashSet;
use std::sync::Arc;

use containers::Hash;
use tracing::debug;

use super::processor::NewPooledTransactionHashesProcessor;
use crate::peers::EthPeer;

/// Hashes announced by one peer during the current buffering window.
#[derive(Debug)]
pub struct BufferedGetPooledTransactionsFromPeerFetcher {
    peer: Arc<dyn EthPeer>,
    tx_hashes: HashSet<Hash>,
}

impl BufferedGetPooledTransactionsFromPeerFetcher {
    pub fn new(peer: Arc<dyn EthPeer>) -> Self {
        Self {
            peer,
            tx_hashes: HashSet::new(),
        }
    }

    pub fn peer(&self) -> &Arc<dyn EthPeer> {
        &self.peer
    }

    /// Returns false if the hash was already buffered.
    pub fn add_hash(&mut self, hash: Hash) -> bool {
        self.tx_hashes.insert(hash)
    }

    pub fn len(&self) -> usize {
        self.tx_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx_hashes.is_empty()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.tx_hashes.contains(hash)
    }

    /// Request every buffered hash the pool still lacks, in one request.
    ///
    /// Received transactions are marked as seen for the peer and handed to
    /// the pool. Failed requests are logged and dropped.
    pub async fn request_transactions(self, processor: &NewPooledTransactionHashesProcessor) {
        let peer_id = self.peer.id();
        let pool = processor.transaction_pool();
        let buffered = self.tx_hashes.len();
        let hashes: Vec<Hash> = self
            .tx_hashes
            .into_iter()
            .filter(|hash| pool.get_transaction_by_hash(hash).is_none())
            .collect();

        if hashes.is_empty() {
            debug!(peer = %peer_id, buffered, "All buffered transactions arrived meanwhile, skipping request");
            return;
        }

        processor
            .metrics()
            .observe_pooled_transactions_request(hashes.len());
        debug!(peer = %peer_id, requested = hashes.len(), "Requesting pooled transactions");

        match self.peer.get_pooled_transactions(hashes).await {
            Ok(transactions) => {
                debug!(peer = %peer_id, received = transactions.len(), "Received pooled transactions");
                if transactions.is_empty() {
                    return;
                }
                processor
                    .transaction_tracker()
                    .mark_transactions_as_seen(peer_id, &transactions);
                pool.add_remote_transactions(transactions);
            }
            Err(err) => {
                debug!(peer = %peer_id, %err, "Pooled transactions request failed");
            }
        }
    }
}
