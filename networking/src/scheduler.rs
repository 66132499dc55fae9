use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;

/// Runs one-shot tasks after a delay.
///
/// Callers hold no locks when scheduling, so an implementation may run the
/// task before `schedule_future_task` returns.
pub trait Scheduler: Send + Sync {
    fn schedule_future_task(&self, task: BoxFuture<'static, ()>, delay: Duration);
}

/// Scheduler backed by the tokio runtime it was created on.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler for the runtime of the calling task.
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_future_task(&self, task: BoxFuture<'static, ()>, delay: Duration) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }
}
