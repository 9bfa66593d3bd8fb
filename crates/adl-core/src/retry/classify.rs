//! Classify HTTP status and transport/batch errors into retry error kinds.

use crate::error::{DownloadError, TransportError};
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        400..=599 => ErrorKind::Http(code),
        _ => ErrorKind::Other,
    }
}

/// Classify a transport failure.
pub fn classify_transport_error(e: &TransportError) -> ErrorKind {
    match e {
        TransportError::Timeout(_) => ErrorKind::Timeout,
        TransportError::Connection(_) => ErrorKind::Connection,
        TransportError::InvalidRequest(_) | TransportError::Other(_) => ErrorKind::Other,
    }
}

/// Classify a batch-level error.
pub fn classify(e: &DownloadError) -> ErrorKind {
    match e {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Transport { source, .. } => classify_transport_error(source),
        DownloadError::Io { .. }
        | DownloadError::RetriesExhausted { .. }
        | DownloadError::InvalidConfig(_)
        | DownloadError::Task(_) => ErrorKind::Other,
    }
}
