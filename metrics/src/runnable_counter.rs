/// Counter that runs an action every `threshold` increments.
///
/// Used to turn a high-rate event into one log line per batch instead of one
/// per event.
use prometheus::IntCounter;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct RunnableCounter {
    backed_counter: IntCounter,
    step_counter: AtomicU64,
    threshold: u64,
    task: Box<dyn Fn() + Send + Sync>,
}

impl RunnableCounter {
    /// A zero threshold is treated as one.
    pub fn new(
        backed_counter: IntCounter,
        task: impl Fn() + Send + Sync + 'static,
        threshold: u64,
    ) -> Self {
        Self {
            backed_counter,
            step_counter: AtomicU64::new(0),
            threshold: threshold.max(1),
            task: Box::new(task),
        }
    }

    pub fn inc(&self) {
        self.backed_counter.inc();
        let steps = self.step_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if steps % self.threshold == 0 {
            (self.task)();
        }
    }

    /// Increments seen by this counter (not by the backing metric).
    pub fn get(&self) -> u64 {
        self.step_counter.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for RunnableCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableCounter")
            .field("steps", &self.get())
            .field("threshold", &self.threshold)
            .finish()
    }
}
