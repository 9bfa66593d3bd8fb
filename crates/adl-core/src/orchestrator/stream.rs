//! Pull-based result stream driving one batch.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::descriptor::{DownloadRequest, FileDescriptor};
use crate::error::DownloadError;
use crate::fetch::{FetchReport, Fetcher};
use crate::probe::Prober;
use crate::progress::ProgressAggregator;
use crate::retry::{classify, RetryDecision, RetryPolicy};
use crate::transport::Transport;

/// What a finished task hands back to the scheduling loop.
enum Step {
    Probed(FileDescriptor),
    Fetched(FetchReport),
    /// A fetch attempt failed; classified before deciding what happens next.
    FetchFailed {
        descriptor: FileDescriptor,
        retry_count: u32,
        error: DownloadError,
    },
}

/// Lazy sequence of destination paths for one batch, in completion order.
///
/// `next` returns `None` once every file is done, or `Some(Err(_))` once when
/// the batch aborts (then `None`). Dropping the stream cancels all work.
pub struct DownloadStream<T> {
    tasks: JoinSet<Result<Step, DownloadError>>,
    fetcher: Fetcher<T>,
    retry: RetryPolicy,
    progress: Arc<ProgressAggregator>,
    finished: bool,
}

impl<T: Transport> DownloadStream<T> {
    /// Spawns a probe for every request; the shared gate bounds how many run.
    pub(super) fn start(
        requests: Vec<DownloadRequest>,
        prober: Prober<T>,
        fetcher: Fetcher<T>,
        retry: RetryPolicy,
        progress: Arc<ProgressAggregator>,
    ) -> Self {
        let mut tasks = JoinSet::new();
        for request in requests {
            let prober = prober.clone();
            tasks.spawn(async move { prober.probe(request).await.map(Step::Probed) });
        }
        Self {
            tasks,
            fetcher,
            retry,
            progress,
            finished: false,
        }
    }

    /// Shared progress counters for this batch.
    pub fn progress(&self) -> Arc<ProgressAggregator> {
        Arc::clone(&self.progress)
    }

    /// Waits for the next completed file.
    pub async fn next(&mut self) -> Option<Result<PathBuf, DownloadError>> {
        if self.finished {
            return None;
        }
        loop {
            let joined = match self.tasks.join_next().await {
                Some(joined) => joined,
                None => {
                    self.finished = true;
                    return None;
                }
            };
            let step = match joined {
                Ok(Ok(step)) => step,
                // probe failures are never retried
                Ok(Err(e)) => return Some(Err(self.abort(e).await)),
                Err(join_err) => {
                    let e = DownloadError::Task(join_err.to_string());
                    return Some(Err(self.abort(e).await));
                }
            };

            match step {
                Step::Probed(descriptor) => self.spawn_fetch(descriptor, 0),
                Step::Fetched(report) => {
                    tracing::debug!(
                        file = %report.descriptor.name(),
                        outcome = ?report.outcome,
                        retries = report.retry_count,
                        "fetched"
                    );
                    return Some(Ok(report.descriptor.destination));
                }
                Step::FetchFailed {
                    descriptor,
                    retry_count,
                    error,
                } => match self.retry.decide(retry_count, classify(&error)) {
                    RetryDecision::Retry { next_retry } => {
                        tracing::debug!(file = %descriptor.name(), next_retry, %error, "re-enqueue");
                        self.spawn_fetch(descriptor, next_retry);
                    }
                    RetryDecision::Exhausted => {
                        let e = DownloadError::RetriesExhausted {
                            url: descriptor.source_url,
                            destination: descriptor.destination,
                            attempts: retry_count + 1,
                        };
                        return Some(Err(self.abort(e).await));
                    }
                    RetryDecision::Fatal => return Some(Err(self.abort(error).await)),
                },
            }
        }
    }

    /// Collects every path, or the first error.
    pub async fn collect(mut self) -> Result<Vec<PathBuf>, DownloadError> {
        let mut paths = Vec::new();
        while let Some(item) = self.next().await {
            paths.push(item?);
        }
        Ok(paths)
    }

    fn spawn_fetch(&mut self, descriptor: FileDescriptor, retry_count: u32) {
        let fetcher = self.fetcher.clone();
        self.tasks.spawn(async move {
            let step = match fetcher.fetch(descriptor.clone(), retry_count).await {
                Ok(report) => Step::Fetched(report),
                Err(error) => Step::FetchFailed {
                    descriptor,
                    retry_count,
                    error,
                },
            };
            Ok(step)
        });
    }

    /// Cancels and awaits everything still running, then ends the stream.
    async fn abort(&mut self, error: DownloadError) -> DownloadError {
        tracing::error!(%error, pending = self.tasks.len(), "aborting batch");
        self.finished = true;
        self.tasks.shutdown().await;
        error
    }
}
