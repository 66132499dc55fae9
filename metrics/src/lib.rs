pub mod runnable_counter;
pub mod server;

pub use runnable_counter::RunnableCounter;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> C {
    registry
        .register(Box::new(collector.clone()))
        .expect("metric names are registered once");
    collector
}

/// Gauge whose value is read from a supplier at scrape time.
struct SuppliedGauge {
    gauge: IntGauge,
    supplier: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl Collector for SuppliedGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.gauge.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.gauge.set((self.supplier)());
        self.gauge.collect()
    }
}

fn int_counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register(
        registry,
        IntCounter::with_opts(Opts::new(name, help)).expect("valid counter options"),
    )
}

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    // Transactions
    skipped_transaction_messages: IntCounter,
    malformed_announcements: IntCounter,
    pooled_transactions_requests: IntCounter,
    pooled_transaction_hashes_requested: IntCounter,
    announced_hashes_already_pooled: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let skipped_transaction_messages = int_counter(
            &registry,
            "transactions_messages_skipped_total",
            "Total number of transaction messages skipped because they expired in the queue",
        );
        let malformed_announcements = int_counter(
            &registry,
            "transactions_malformed_announcements_total",
            "Total number of malformed pooled transaction hashes announcements",
        );
        let pooled_transactions_requests = int_counter(
            &registry,
            "transactions_pooled_hashes_requests_total",
            "Total number of pooled transactions requests sent to peers",
        );
        let pooled_transaction_hashes_requested = int_counter(
            &registry,
            "transactions_pooled_hashes_requested_total",
            "Total number of transaction hashes requested from peers",
        );
        let announced_hashes_already_pooled = int_counter(
            &registry,
            "transactions_announced_hashes_already_pooled_total",
            "Total number of announced transaction hashes already present in the pool",
        );

        Self {
            registry,
            skipped_transaction_messages,
            malformed_announcements,
            pooled_transactions_requests,
            pooled_transaction_hashes_requested,
            announced_hashes_already_pooled,
        }
    }

    pub fn gather(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::<u8>::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(%err, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Register a gauge that reads `supplier` every time metrics are gathered.
    pub fn register_gauge_fn(
        &self,
        name: &str,
        help: &str,
        supplier: impl Fn() -> i64 + Send + Sync + 'static,
    ) -> prometheus::Result<()> {
        let gauge = IntGauge::with_opts(Opts::new(name, help))?;
        self.registry.register(Box::new(SuppliedGauge {
            gauge,
            supplier: Box::new(supplier),
        }))
    }

    // Transactions
    /// Counter backing the expired-message [`RunnableCounter`].
    pub fn skipped_transaction_messages_counter(&self) -> IntCounter {
        self.skipped_transaction_messages.clone()
    }

    pub fn skipped_transaction_messages(&self) -> u64 {
        self.skipped_transaction_messages.get()
    }

    pub fn inc_malformed_announcements(&self) {
        self.malformed_announcements.inc();
    }

    pub fn malformed_announcements(&self) -> u64 {
        self.malformed_announcements.get()
    }

    pub fn observe_pooled_transactions_request(&self, hashes: usize) {
        self.pooled_transactions_requests.inc();
        self.pooled_transaction_hashes_requested.inc_by(hashes as u64);
    }

    pub fn pooled_transactions_requests(&self) -> u64 {
        self.pooled_transactions_requests.get()
    }

    pub fn pooled_transaction_hashes_requested(&self) -> u64 {
        self.pooled_transaction_hashes_requested.get()
    }

    pub fn inc_announced_hashes_already_pooled(&self, count: usize) {
        self.announced_hashes_already_pooled.inc_by(count as u64);
    }

    pub fn announced_hashes_already_pooled(&self) -> u64 {
        self.announced_hashes_already_pooled.get()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn supplied_gauge_is_read_at_gather_time() {
        let metrics = Metrics::new();
        let height = Arc::new(AtomicI64::new(10));
        let supplier_height = height.clone();
        metrics
            .register_gauge_fn("test_best_known", "test", move || {
                supplier_height.load(Ordering::Relaxed)
            })
            .unwrap();

        assert!(metrics.gather().contains("test_best_known 10"));
        height.store(1234, Ordering::Relaxed);
        assert!(metrics.gather().contains("test_best_known 1234"));
    }

    #[test]
    fn duplicate_gauge_registration_fails() {
        let metrics = Metrics::new();
        metrics.register_gauge_fn("test_gauge", "test", || 0).unwrap();
        assert!(metrics.register_gauge_fn("test_gauge", "test", || 1).is_err());
    }

    #[test]
    fn request_observation_counts_requests_and_hashes() {
        let metrics = Metrics::new();
        metrics.observe_pooled_transactions_request(3);
        metrics.observe_pooled_transactions_request(2);

        assert_eq!(metrics.pooled_transactions_requests(), 2);
        assert_eq!(metrics.pooled_transaction_hashes_requested(), 5);
    }
}
