//! Concurrent, resumable batch downloads over HTTP(S).
//!
//! Pipeline per file: probe (HEAD) → fetch (ranged GET into `.part`) →
//! atomic rename, all bounded by one shared concurrency gate. See
//! [`orchestrator::Downloader`] for the entry point.

pub mod config;
pub mod logging;

pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod storage;
pub mod transport;
pub mod url_model;

pub use config::DownloaderConfig;
pub use descriptor::{DownloadRequest, FileDescriptor};
pub use error::{DownloadError, TransportError};
pub use orchestrator::{download_files, DownloadStream, Downloader};
