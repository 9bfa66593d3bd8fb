//! Download requests and resolved download targets.

use std::path::{Path, PathBuf};

/// One requested download: a URL and optionally the name to save it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Relative names land in the download directory; absolute ones are used as-is.
    pub file_name: Option<PathBuf>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: None,
        }
    }

    pub fn named(url: impl Into<String>, file_name: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            file_name: Some(file_name.into()),
        }
    }

    /// Parses a list line: `URL` or `URL NAME`. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        match line.split_once(char::is_whitespace) {
            Some((url, name)) if !name.trim().is_empty() => Some(Self::named(url, name.trim())),
            _ => Some(Self::new(line)),
        }
    }
}

impl From<&str> for DownloadRequest {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for DownloadRequest {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl<U: Into<String>, P: Into<PathBuf>> From<(U, P)> for DownloadRequest {
    fn from((url, name): (U, P)) -> Self {
        Self::named(url, name)
    }
}

/// A resolved download target. Immutable once probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Redirect-final URL.
    pub source_url: String,
    /// Absolute destination path; always has a file name.
    pub destination: PathBuf,
    /// Size reported by the server; 0 when unknown.
    pub expected_size: u64,
    /// True only when the server advertised byte ranges.
    pub supports_range: bool,
}

impl FileDescriptor {
    /// File name of the destination, for labels and messages.
    pub fn name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}
