use std::collections::HashMap;

use containers::{Hash, Transaction};
use parking_lot::RwLock;
use tracing::trace;

/// The local pending transaction pool, as far as gossip intake needs it.
pub trait TransactionPool: Send + Sync {
    fn get_transaction_by_hash(&self, hash: &Hash) -> Option<Transaction>;

    /// Add transactions received from a peer.
    fn add_remote_transactions(&self, transactions: Vec<Transaction>);
}

/// Unbounded pool keyed by transaction hash.
#[derive(Debug, Default)]
pub struct InMemoryTransactionPool {
    transactions: RwLock<HashMap<Hash, Transaction>>,
}

impl InMemoryTransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_local_transaction(&self, transaction: Transaction) {
        self.transactions
            .write()
            .insert(transaction.hash(), transaction);
    }

    pub fn len(&self) -> usize {
        self.transactions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.read().is_empty()
    }
}

impl TransactionPool for InMemoryTransactionPool {
    fn get_transaction_by_hash(&self, hash: &Hash) -> Option<Transaction> {
        self.transactions.read().get(hash).cloned()
    }

    fn add_remote_transactions(&self, transactions: Vec<Transaction>) {
        let mut pool = self.transactions.write();
        for transaction in transactions {
            trace!(hash = %transaction.hash(), "Adding remote transaction");
            pool.entry(transaction.hash()).or_insert(transaction);
        }
    }
}
