//! HTTP transport seam.
//!
//! The engine talks to the network only through [`Transport`]: a metadata
//! probe (HEAD, redirects followed) and a streamed, optionally ranged GET.
//! [`CurlTransport`] is the libcurl-backed implementation; tests plug in
//! in-memory transports.

mod curl;
mod parse;

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::TransportError;

pub use self::curl::CurlTransport;

/// Body chunk size; also the largest chunk a [`BodyStream`] yields from curl.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Metadata returned by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResponse {
    /// Status of the final response in the redirect chain.
    pub status: u32,
    /// Redirect-final URL.
    pub url: String,
    /// `Content-Length`, if present and numeric.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// Raw `Content-Disposition` value, if present.
    pub content_disposition: Option<String>,
}

/// A GET, ranged from `offset` when it is non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub url: String,
    pub offset: u64,
    pub timeout: Duration,
}

/// Status plus a streamed body.
#[derive(Debug)]
pub struct GetResponse {
    pub status: u32,
    pub body: BodyStream,
}

type Chunk = Result<Vec<u8>, TransportError>;

/// Pull-based response body. Dropping it tells the producer to stop.
#[derive(Debug)]
pub struct BodyStream {
    rx: mpsc::Receiver<Chunk>,
}

/// Producer half of a [`BodyStream`].
pub type BodySender = mpsc::Sender<Chunk>;

impl BodyStream {
    /// Creates a body fed through a bounded channel of `depth` chunks.
    pub fn channel(depth: usize) -> (BodySender, BodyStream) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (tx, BodyStream { rx })
    }

    /// Next chunk; `Ok(None)` once the body is complete.
    pub async fn chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.rx.recv().await {
            Some(Ok(data)) => Ok(Some(data)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

/// HTTP operations the engine needs.
pub trait Transport: Send + Sync + 'static {
    /// HEAD `url`, following redirects, within `timeout`.
    fn head(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<HeadResponse, TransportError>> + Send;

    /// GET with `Range: bytes=<offset>-` when `offset > 0`. Resolves once the
    /// response status is known; the body streams afterwards.
    fn get(
        &self,
        request: GetRequest,
    ) -> impl Future<Output = Result<GetResponse, TransportError>> + Send;
}
