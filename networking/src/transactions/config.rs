//! Transaction gossip constants.

/// Expired messages skipped between two aggregate warnings.
pub const SKIPPED_MESSAGES_LOGGING_THRESHOLD: u64 = 1000;

/// Seen hashes remembered per peer before the oldest are forgotten.
pub const MAX_TRACKED_SEEN_TRANSACTIONS_PER_PEER: usize = 100_000;
