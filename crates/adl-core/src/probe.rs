//! Metadata probe: one HEAD per requested URL, resolved into a [`FileDescriptor`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::descriptor::{DownloadRequest, FileDescriptor};
use crate::error::DownloadError;
use crate::progress::ProgressAggregator;
use crate::transport::Transport;
use crate::url_model;

/// Runs probes through the shared concurrency gate.
pub struct Prober<T> {
    transport: Arc<T>,
    gate: Arc<Semaphore>,
    progress: Arc<ProgressAggregator>,
    download_dir: PathBuf,
    timeout: Duration,
}

impl<T> Clone for Prober<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            gate: Arc::clone(&self.gate),
            progress: Arc::clone(&self.progress),
            download_dir: self.download_dir.clone(),
            timeout: self.timeout,
        }
    }
}

impl<T: Transport> Prober<T> {
    pub fn new(
        transport: Arc<T>,
        gate: Arc<Semaphore>,
        progress: Arc<ProgressAggregator>,
        download_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            gate,
            progress,
            download_dir,
            timeout,
        }
    }

    /// Probes one request. The permit is held for the whole HEAD exchange.
    ///
    /// Status above 400 and any transport failure are fatal for the batch.
    pub async fn probe(&self, request: DownloadRequest) -> Result<FileDescriptor, DownloadError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| DownloadError::Task("concurrency gate closed".into()))?;

        // Counted before the request so the checked count reflects attempts.
        let checked = self.progress.record_checked().await;
        tracing::debug!(url = %request.url, checked, "probing");

        let head = self
            .transport
            .head(&request.url, self.timeout)
            .await
            .map_err(|source| DownloadError::Transport {
                url: request.url.clone(),
                source,
            })?;

        if head.status > 400 {
            self.progress
                .message(&format!("Status {}: {}", head.status, request.url));
            tracing::warn!(url = %request.url, status = head.status, "probe rejected");
            return Err(DownloadError::HttpStatus {
                url: request.url,
                status: head.status,
            });
        }

        let expected_size = head.content_length.unwrap_or(0);
        let destination = url_model::resolve_destination(
            &self.download_dir,
            request.file_name.as_deref(),
            &head.url,
            head.content_disposition.as_deref(),
        );

        self.progress.add_expected(expected_size).await;

        tracing::debug!(
            url = %head.url,
            destination = %destination.display(),
            expected_size,
            supports_range = head.accept_ranges,
            "probed"
        );

        Ok(FileDescriptor {
            source_url: head.url,
            destination,
            expected_size,
            supports_range: head.accept_ranges,
        })
    }
}
