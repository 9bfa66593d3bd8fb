//! Error types shared by the engine.

use std::path::PathBuf;

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connect, request or stall deadline elapsed.
    #[error("timed out: {0}")]
    Timeout(String),
    /// Connection could not be established or was reset.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The request could not be built (bad URL, unsupported option).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Other(String),
}

/// Error that terminates a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Server answered with an error status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u32 },

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Local file system failure (sidecar write, rename, metadata).
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file kept timing out until the retry ceiling was reached.
    #[error("giving up on {url} after {attempts} attempts ({})", destination.display())]
    RetriesExhausted {
        url: String,
        destination: PathBuf,
        attempts: u32,
    },

    /// Configuration values the engine cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A probe or fetch task panicked or was cancelled.
    #[error("download task failed: {0}")]
    Task(String),
}

impl DownloadError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| DownloadError::Io { path, source }
    }
}
