use std::fmt;

use anyhow::Result;
use containers::{Hash, Transaction};
use futures::future::BoxFuture;
use libp2p_identity::PeerId;

use crate::types::DisconnectReason;

/// Handle to a connected eth peer, as seen by the sync core.
///
/// Implemented by the protocol layer. Requests return immediately with a
/// future; nothing here blocks the calling thread on I/O.
pub trait EthPeer: Send + Sync + fmt::Debug {
    fn id(&self) -> PeerId;

    fn is_disconnected(&self) -> bool;

    /// Tear the connection down with the given reason.
    fn disconnect(&self, reason: DisconnectReason);

    /// Ask the peer for the full transactions behind `hashes`.
    ///
    /// Peers may answer with fewer transactions than requested.
    fn get_pooled_transactions(&self, hashes: Vec<Hash>) -> BoxFuture<'static, Result<Vec<Transaction>>>;
}
