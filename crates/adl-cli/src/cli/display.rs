//! Terminal rendering of batch progress with `indicatif`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use adl_core::progress::{ProgressSink, TaskId};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{prefix:>28.bold} {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.blue} {prefix:>26.bold} {bytes} ({bytes_per_sec})";
const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";
const PB_CHARS: &str = "█▓▒░  ";

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .map(|s| s.progress_chars(PB_CHARS))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .map(|s| s.tick_chars(TICK))
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// [`ProgressSink`] drawing one bar per transfer above a batch total bar.
///
/// The first task created is the total; later ones are inserted at the top,
/// so the newest transfer is always first.
pub struct IndicatifSink {
    multi: MultiProgress,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
    next: AtomicU64,
}

impl Default for IndicatifSink {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatifSink {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            next: AtomicU64::new(0),
        }
    }

    fn bars(&self) -> MutexGuard<'_, HashMap<TaskId, ProgressBar>> {
        self.bars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_bar(&self, task: TaskId, f: impl FnOnce(&ProgressBar)) {
        if let Some(pb) = self.bars().get(&task) {
            f(pb);
        }
    }

    /// Prints a finished destination to stdout without tearing the bars.
    pub fn print_path(&self, path: &Path) {
        self.multi.suspend(|| println!("{}", path.display()));
    }

    /// Leaves the total bar on screen and drops the rest.
    pub fn finish(&self) {
        let mut bars = self.bars();
        let mut ids: Vec<TaskId> = bars.keys().copied().collect();
        ids.sort();
        for (i, id) in ids.into_iter().enumerate() {
            if let Some(pb) = bars.remove(&id) {
                if i == 0 {
                    pb.finish();
                } else {
                    pb.finish_and_clear();
                }
            }
        }
    }
}

impl ProgressSink for IndicatifSink {
    fn add_task(&self, label: &str, total: Option<u64>, completed: u64) -> TaskId {
        let id = TaskId(self.next.fetch_add(1, Ordering::Relaxed));
        let pb = match total {
            Some(len) => ProgressBar::new(len).with_style(bar_style()),
            None => ProgressBar::no_length().with_style(spinner_style()),
        };
        pb.set_prefix(label.to_string());
        pb.set_position(completed);

        let pb = if id.0 == 0 {
            self.multi.add(pb)
        } else {
            self.multi.insert(0, pb)
        };
        self.bars().insert(id, pb);
        id
    }

    fn advance(&self, task: TaskId, delta: u64) {
        self.with_bar(task, |pb| pb.inc(delta));
    }

    fn set_position(&self, task: TaskId, completed: u64) {
        self.with_bar(task, |pb| pb.set_position(completed));
    }

    fn set_total(&self, task: TaskId, total: u64) {
        self.with_bar(task, |pb| {
            if pb.length().is_none() {
                pb.set_style(bar_style());
            }
            pb.set_length(total);
        });
    }

    fn set_label(&self, task: TaskId, label: &str) {
        self.with_bar(task, |pb| pb.set_prefix(label.to_string()));
    }

    fn remove_task(&self, task: TaskId) {
        if let Some(pb) = self.bars().remove(&task) {
            pb.finish_and_clear();
            self.multi.remove(&pb);
        }
    }

    fn message(&self, line: &str) {
        if self.multi.is_hidden() {
            eprintln!("{line}");
        } else {
            let _ = self.multi.println(line);
        }
    }
}
