//! Batch-wide counters shared by all probe and fetch tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{ProgressSink, TaskId};

/// Handle of one in-flight transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(u64);

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub files_checked: u64,
    pub files_total: u64,
    /// Sum of probed sizes; grows as probes complete.
    pub bytes_expected: u64,
    /// Bytes streamed, resumed or found already complete.
    pub bytes_transferred: u64,
    pub active_transfers: usize,
}

#[derive(Debug)]
struct Transfer {
    task: TaskId,
    /// What this attempt added to `bytes_transferred` (resume offset + streamed).
    contributed: u64,
}

#[derive(Debug, Default)]
struct State {
    counters: ProgressSnapshot,
    next_transfer: u64,
    transfers: HashMap<TransferId, Transfer>,
}

/// Lock-protected aggregate progress forwarded to a [`ProgressSink`].
pub struct ProgressAggregator {
    state: Mutex<State>,
    sink: Arc<dyn ProgressSink>,
    main_task: TaskId,
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("main_task", &self.main_task)
            .finish_non_exhaustive()
    }
}

fn checking_label(checked: u64, total: u64) -> String {
    if checked == total {
        "Total".to_string()
    } else {
        format!("Checking {checked}/{total}")
    }
}

impl ProgressAggregator {
    /// Creates the counters for a batch of `files_total` files and the sink's total bar.
    pub fn new(sink: Arc<dyn ProgressSink>, files_total: u64) -> Self {
        let main_task = sink.add_task(&checking_label(0, files_total), None, 0);
        let state = State {
            counters: ProgressSnapshot {
                files_total,
                ..ProgressSnapshot::default()
            },
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
            sink,
            main_task,
        }
    }

    /// Counts one probe attempt; returns the new checked count.
    pub async fn record_checked(&self) -> u64 {
        let mut state = self.state.lock().await;
        let c = &mut state.counters;
        c.files_checked += 1;
        self.sink
            .set_label(self.main_task, &checking_label(c.files_checked, c.files_total));
        c.files_checked
    }

    /// Adds a probed size to the expected total.
    pub async fn add_expected(&self, bytes: u64) {
        let mut state = self.state.lock().await;
        state.counters.bytes_expected += bytes;
        self.sink.set_total(self.main_task, state.counters.bytes_expected);
    }

    /// Credits bytes that need no transfer (file already complete).
    pub async fn advance(&self, bytes: u64) {
        let mut state = self.state.lock().await;
        state.counters.bytes_transferred += bytes;
        self.sink.advance(self.main_task, bytes);
    }

    /// Registers a transfer attempt starting at `offset` and credits the offset.
    pub async fn begin_transfer(&self, label: &str, total: u64, offset: u64) -> TransferId {
        let mut state = self.state.lock().await;
        let id = TransferId(state.next_transfer);
        state.next_transfer += 1;

        let task = self
            .sink
            .add_task(label, (total > 0).then_some(total), offset);
        state.transfers.insert(
            id,
            Transfer {
                task,
                contributed: offset,
            },
        );
        state.counters.bytes_transferred += offset;
        state.counters.active_transfers = state.transfers.len();
        self.sink.advance(self.main_task, offset);
        id
    }

    /// Credits a written chunk to both the transfer and the aggregate.
    pub async fn advance_transfer(&self, id: TransferId, bytes: u64) {
        let mut state = self.state.lock().await;
        let Some(transfer) = state.transfers.get_mut(&id) else {
            return;
        };
        transfer.contributed += bytes;
        let task = transfer.task;
        state.counters.bytes_transferred += bytes;
        self.sink.advance(task, bytes);
        self.sink.advance(self.main_task, bytes);
    }

    /// Removes a completed transfer; its bytes stay credited.
    pub async fn finish_transfer(&self, id: TransferId) {
        let mut state = self.state.lock().await;
        if let Some(transfer) = state.transfers.remove(&id) {
            self.sink.remove_task(transfer.task);
        }
        state.counters.active_transfers = state.transfers.len();
    }

    /// Removes a failed transfer and takes back everything it credited, so a
    /// retry that resumes from the sidecar does not count those bytes twice.
    pub async fn abandon_transfer(&self, id: TransferId) {
        let mut state = self.state.lock().await;
        if let Some(transfer) = state.transfers.remove(&id) {
            self.sink.remove_task(transfer.task);
            let c = &mut state.counters;
            c.bytes_transferred = c.bytes_transferred.saturating_sub(transfer.contributed);
            self.sink.set_position(self.main_task, c.bytes_transferred);
        }
        state.counters.active_transfers = state.transfers.len();
    }

    /// Status line for the user; not part of the counters.
    pub fn message(&self, line: &str) {
        self.sink.message(line);
    }

    pub async fn snapshot(&self) -> ProgressSnapshot {
        self.state.lock().await.counters
    }
}
