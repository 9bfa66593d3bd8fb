//! Disk I/O for the `.part` sidecar and its atomic finalize.
//!
//! Transfers stage into `<destination>.part`, opened either for append
//! (resume) or truncate-create (fresh). Every chunk is written through before
//! the next one is read; finalize flushes, syncs and renames in place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;

/// Sidecar suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the sidecar: appends `.part` (`file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Size of the file at `path`, or `None` if it does not exist.
pub async fn existing_len(path: &Path) -> Result<Option<u64>, DownloadError> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DownloadError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// An open sidecar file.
#[derive(Debug)]
pub struct PartFile {
    file: File,
    path: PathBuf,
}

impl PartFile {
    /// Opens `path` for appending after `resume_from` existing bytes, or
    /// truncates/creates it when `resume_from` is 0.
    pub async fn open(path: &Path, resume_from: u64) -> Result<Self, DownloadError> {
        let mut opts = OpenOptions::new();
        if resume_from > 0 {
            opts.append(true);
        } else {
            opts.write(true).create(true).truncate(true);
        }
        let file = opts.open(path).await.map_err(DownloadError::io(path))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Appends one chunk and waits until it has been handed to the OS.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<(), DownloadError> {
        self.file
            .write_all(data)
            .await
            .map_err(DownloadError::io(&self.path))?;
        self.file.flush().await.map_err(DownloadError::io(&self.path))?;
        Ok(())
    }

    /// Syncs and renames the sidecar onto `final_path`. Fails if `final_path`
    /// is on a different filesystem.
    pub async fn finalize(mut self, final_path: &Path) -> Result<(), DownloadError> {
        self.file.flush().await.map_err(DownloadError::io(&self.path))?;
        self.file
            .sync_all()
            .await
            .map_err(DownloadError::io(&self.path))?;
        drop(self.file);
        fs::rename(&self.path, final_path)
            .await
            .map_err(DownloadError::io(final_path))
    }
}

/// Renames an already complete sidecar without reopening it.
pub async fn finalize_existing(part: &Path, final_path: &Path) -> Result<(), DownloadError> {
    fs::rename(part, final_path)
        .await
        .map_err(DownloadError::io(final_path))
}
