//! Batch orchestration.
//!
//! A batch probes every request concurrently, pipelines each probe into a
//! fetch as soon as it completes, and re-enqueues timed-out fetches until
//! the retry ceiling. Probes and fetches share one semaphore, so the cap
//! bounds total outstanding I/O rather than per-phase I/O.

mod stream;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::DownloaderConfig;
use crate::descriptor::DownloadRequest;
use crate::error::DownloadError;
use crate::fetch::{FetchOptions, Fetcher};
use crate::probe::Prober;
use crate::progress::{NullSink, ProgressAggregator, ProgressSink};
use crate::retry::RetryPolicy;
use crate::transport::{CurlTransport, Transport};

pub use stream::DownloadStream;

/// Entry point for batch downloads.
pub struct Downloader<T = CurlTransport> {
    transport: Arc<T>,
    config: DownloaderConfig,
    sink: Arc<dyn ProgressSink>,
}

impl Downloader<CurlTransport> {
    pub fn new(config: DownloaderConfig) -> Self {
        Self::with_transport(config, CurlTransport::new())
    }
}

impl<T: Transport> Downloader<T> {
    pub fn with_transport(config: DownloaderConfig, transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            sink: Arc::new(NullSink::default()),
        }
    }

    /// Renders progress and status lines through `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Starts a batch and returns its result stream.
    ///
    /// Fails only if the configuration is invalid or the download directory
    /// cannot be resolved or created.
    pub async fn stream<I, R>(&self, requests: I) -> Result<DownloadStream<T>, DownloadError>
    where
        I: IntoIterator<Item = R>,
        R: Into<DownloadRequest>,
    {
        self.config.validate()?;
        let requests: Vec<DownloadRequest> = requests.into_iter().map(Into::into).collect();
        let download_dir = self.prepare_download_dir().await?;

        tracing::info!(
            files = requests.len(),
            dir = %download_dir.display(),
            concurrency = self.config.concurrent_downloads,
            "starting batch"
        );
        self.sink.message(&format!(
            "Downloading {} files to {}",
            requests.len(),
            download_dir.display()
        ));

        let gate = Arc::new(Semaphore::new(self.config.concurrent_downloads.max(1)));
        let progress = Arc::new(ProgressAggregator::new(
            Arc::clone(&self.sink),
            requests.len() as u64,
        ));
        let retry = RetryPolicy::from(&self.config.retry_config());
        let timeout = self.config.timeout();

        let prober = Prober::new(
            Arc::clone(&self.transport),
            Arc::clone(&gate),
            Arc::clone(&progress),
            download_dir,
            timeout,
        );
        let fetcher = Fetcher::new(
            Arc::clone(&self.transport),
            gate,
            Arc::clone(&progress),
            FetchOptions {
                allow_overwrite: self.config.allow_overwrite,
                allow_partial: self.config.allow_partial,
                timeout,
                retry,
            },
        );

        Ok(DownloadStream::start(requests, prober, fetcher, retry, progress))
    }

    /// Runs a batch to completion and returns every destination path.
    pub async fn download<I, R>(&self, requests: I) -> Result<Vec<PathBuf>, DownloadError>
    where
        I: IntoIterator<Item = R>,
        R: Into<DownloadRequest>,
    {
        self.stream(requests).await?.collect().await
    }

    async fn prepare_download_dir(&self) -> Result<PathBuf, DownloadError> {
        let requested = self.config.download_dir.clone().unwrap_or_else(|| ".".into());
        let dir = self
            .config
            .resolved_download_dir()
            .map_err(DownloadError::io(&requested))?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(DownloadError::io(&dir))?;
        Ok(dir)
    }
}

/// Downloads `requests` with the curl transport and no progress display.
pub async fn download_files<I, R>(
    requests: I,
    config: DownloaderConfig,
) -> Result<Vec<PathBuf>, DownloadError>
where
    I: IntoIterator<Item = R>,
    R: Into<DownloadRequest>,
{
    Downloader::new(config).download(requests).await
}
