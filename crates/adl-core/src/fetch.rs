//! Transfer of one resolved file: pre-flight checks, resume, streamed write,
//! atomic finalize, and timeout reporting for the orchestrator to retry.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time;

use crate::descriptor::FileDescriptor;
use crate::error::{DownloadError, TransportError};
use crate::progress::{ProgressAggregator, TransferId};
use crate::retry::{classify_transport_error, RetryPolicy};
use crate::storage::{self, PartFile};
use crate::transport::{BodyStream, GetRequest, Transport};

/// HTTP status of a satisfied range request.
const PARTIAL_CONTENT: u32 = 206;

/// How a successful fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Body streamed and the sidecar renamed into place.
    Downloaded,
    /// Destination already had the expected size; nothing was requested.
    AlreadyComplete,
    /// Destination had a different size and overwriting is disabled.
    SkippedMismatch,
}

/// Result of one successful attempt, handed back to the orchestrator.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub descriptor: FileDescriptor,
    pub retry_count: u32,
    pub outcome: FetchOutcome,
}

/// Fetch behaviour switches.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub allow_overwrite: bool,
    pub allow_partial: bool,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

fn stalled(timeout: Duration) -> TransportError {
    TransportError::Timeout(format!("no data for {timeout:?}"))
}

enum StreamFailure {
    Transport(TransportError),
    Local(DownloadError),
}

/// Runs fetches through the shared concurrency gate.
pub struct Fetcher<T> {
    transport: Arc<T>,
    gate: Arc<Semaphore>,
    progress: Arc<ProgressAggregator>,
    options: FetchOptions,
}

impl<T> Clone for Fetcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            gate: Arc::clone(&self.gate),
            progress: Arc::clone(&self.progress),
            options: self.options,
        }
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn new(
        transport: Arc<T>,
        gate: Arc<Semaphore>,
        progress: Arc<ProgressAggregator>,
        options: FetchOptions,
    ) -> Self {
        Self {
            transport,
            gate,
            progress,
            options,
        }
    }

    /// One attempt at `descriptor`.
    ///
    /// Every failure comes back as an error, timeouts included; the
    /// orchestrator classifies it and decides whether to try again.
    pub async fn fetch(
        &self,
        descriptor: FileDescriptor,
        retry_count: u32,
    ) -> Result<FetchReport, DownloadError> {
        let outcome = match self.preflight(&descriptor).await? {
            Some(outcome) => outcome,
            None => {
                let delay = self.options.retry.delay(retry_count);
                if !delay.is_zero() {
                    tracing::debug!(file = %descriptor.name(), retry_count, ?delay, "backing off");
                    tokio::time::sleep(delay).await;
                }
                let _permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|_| DownloadError::Task("concurrency gate closed".into()))?;
                self.transfer(&descriptor, retry_count).await?
            }
        };

        Ok(FetchReport {
            descriptor,
            retry_count,
            outcome,
        })
    }

    /// Decides from the destination alone whether any transfer is needed.
    async fn preflight(&self, d: &FileDescriptor) -> Result<Option<FetchOutcome>, DownloadError> {
        let Some(existing) = storage::existing_len(&d.destination).await? else {
            return Ok(None);
        };
        if existing == d.expected_size {
            self.progress.advance(existing).await;
            tracing::debug!(path = %d.destination.display(), "already complete");
            return Ok(Some(FetchOutcome::AlreadyComplete));
        }

        tracing::warn!(
            path = %d.destination.display(),
            existing,
            expected = d.expected_size,
            overwrite = self.options.allow_overwrite,
            "destination exists with a different size"
        );
        if self.options.allow_overwrite {
            self.progress.message(&format!(
                "File already exists, but has different size, overwriting {}",
                d.destination.display()
            ));
            Ok(None)
        } else {
            self.progress.message(&format!(
                "File already exists, but has different size, skipping {}",
                d.destination.display()
            ));
            Ok(Some(FetchOutcome::SkippedMismatch))
        }
    }

    /// Resume offset from the sidecar, or 0 when resume is not possible.
    async fn resume_offset(&self, d: &FileDescriptor, part: &Path) -> Result<u64, DownloadError> {
        if !(self.options.allow_partial && d.supports_range) {
            return Ok(0);
        }
        let len = storage::existing_len(part).await?.unwrap_or(0);
        if d.expected_size > 0 && len > d.expected_size {
            tracing::debug!(path = %part.display(), len, "sidecar larger than expected, restarting");
            return Ok(0);
        }
        Ok(len)
    }

    async fn transfer(
        &self,
        d: &FileDescriptor,
        retry_count: u32,
    ) -> Result<FetchOutcome, DownloadError> {
        let part = storage::temp_path(&d.destination);
        let mut offset = self.resume_offset(d, &part).await?;

        if offset > 0 && offset == d.expected_size {
            self.progress.advance(offset).await;
            storage::finalize_existing(&part, &d.destination).await?;
            self.downloaded(d);
            return Ok(FetchOutcome::Downloaded);
        }

        let request = GetRequest {
            url: d.source_url.clone(),
            offset,
            timeout: self.options.timeout,
        };
        let response = match time::timeout(self.options.timeout, self.transport.get(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => return Err(self.transport_failure(d, None, source).await),
            Err(_) => {
                let source = stalled(self.options.timeout);
                return Err(self.transport_failure(d, None, source).await);
            }
        };
        if response.status >= 400 {
            return Err(DownloadError::HttpStatus {
                url: d.source_url.clone(),
                status: response.status,
            });
        }
        if offset > 0 && response.status != PARTIAL_CONTENT {
            tracing::debug!(url = %d.source_url, status = response.status, "range ignored, restarting");
            offset = 0;
        }

        let label = match retry_count {
            0 => d.name(),
            n => format!("{} (retry {n})", d.name()),
        };
        let transfer = self
            .progress
            .begin_transfer(&label, d.expected_size, offset)
            .await;

        match self.stream_body(response.body, &part, offset, transfer).await {
            Ok(part_file) => {
                if let Err(e) = part_file.finalize(&d.destination).await {
                    self.progress.abandon_transfer(transfer).await;
                    return Err(e);
                }
                self.progress.finish_transfer(transfer).await;
                self.downloaded(d);
                Ok(FetchOutcome::Downloaded)
            }
            Err(StreamFailure::Transport(source)) => {
                Err(self.transport_failure(d, Some(transfer), source).await)
            }
            Err(StreamFailure::Local(e)) => {
                self.progress.abandon_transfer(transfer).await;
                Err(e)
            }
        }
    }

    /// Appends each chunk to the sidecar and credits it before reading the next.
    ///
    /// Waiting longer than the timeout for any one chunk counts as a stall.
    async fn stream_body(
        &self,
        mut body: BodyStream,
        part: &Path,
        offset: u64,
        transfer: TransferId,
    ) -> Result<PartFile, StreamFailure> {
        let mut part_file = PartFile::open(part, offset)
            .await
            .map_err(StreamFailure::Local)?;
        loop {
            let next = time::timeout(self.options.timeout, body.chunk())
                .await
                .unwrap_or_else(|_| Err(stalled(self.options.timeout)));
            match next {
                Ok(Some(data)) => {
                    part_file
                        .write_chunk(&data)
                        .await
                        .map_err(StreamFailure::Local)?;
                    self.progress
                        .advance_transfer(transfer, data.len() as u64)
                        .await;
                }
                Ok(None) => return Ok(part_file),
                Err(e) => return Err(StreamFailure::Transport(e)),
            }
        }
    }

    /// Rolls back the attempt's progress and wraps `source` for the orchestrator.
    async fn transport_failure(
        &self,
        d: &FileDescriptor,
        transfer: Option<TransferId>,
        source: TransportError,
    ) -> DownloadError {
        if let Some(transfer) = transfer {
            self.progress.abandon_transfer(transfer).await;
        }
        if classify_transport_error(&source).is_retryable() {
            tracing::warn!(file = %d.name(), error = %source, "timeout");
            self.progress.message(&format!("Timeout {}", d.name()));
        }
        DownloadError::Transport {
            url: d.source_url.clone(),
            source,
        }
    }

    fn downloaded(&self, d: &FileDescriptor) {
        tracing::info!(path = %d.destination.display(), "downloaded");
        self.progress.message(&format!("Downloaded {}", d.name()));
    }
}
