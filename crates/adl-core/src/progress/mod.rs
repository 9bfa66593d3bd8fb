//! Progress accounting and the display seam.
//!
//! [`ProgressAggregator`] owns the batch counters; every update is applied
//! under its lock and then forwarded to a [`ProgressSink`], which only
//! renders. Correctness never depends on the sink.

mod aggregator;

pub use aggregator::{ProgressAggregator, ProgressSnapshot, TransferId};

/// Handle of one bar in a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Renders named progress bars from numeric updates.
///
/// Called while the aggregator lock is held, so implementations must not block.
pub trait ProgressSink: Send + Sync {
    /// Creates a bar. `total` is `None` while unknown.
    fn add_task(&self, label: &str, total: Option<u64>, completed: u64) -> TaskId;
    fn advance(&self, task: TaskId, delta: u64);
    /// Moves a bar to an absolute position (used when progress is rolled back).
    fn set_position(&self, task: TaskId, completed: u64);
    fn set_total(&self, task: TaskId, total: u64);
    fn set_label(&self, task: TaskId, label: &str);
    fn remove_task(&self, task: TaskId);
    /// A status line (downloaded, timeout, size mismatch).
    fn message(&self, line: &str);
}

/// Sink that renders nothing.
#[derive(Debug, Default)]
pub struct NullSink {
    next: std::sync::atomic::AtomicU64,
}

impl ProgressSink for NullSink {
    fn add_task(&self, _label: &str, _total: Option<u64>, _completed: u64) -> TaskId {
        TaskId(self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }

    fn advance(&self, _task: TaskId, _delta: u64) {}

    fn set_position(&self, _task: TaskId, _completed: u64) {}

    fn set_total(&self, _task: TaskId, _total: u64) {}

    fn set_label(&self, _task: TaskId, _label: &str) {}

    fn remove_task(&self, _task: TaskId) {}

    fn message(&self, _line: &str) {}
}
