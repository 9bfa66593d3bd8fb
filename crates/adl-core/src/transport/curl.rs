//! libcurl-backed transport.
//!
//! Each request runs on tokio's blocking pool with its own `Easy` handle.
//! GET bodies are forwarded chunk by chunk over a bounded channel, so a slow
//! consumer back-pressures curl and a dropped [`BodyStream`] aborts the transfer.

use std::cell::Cell;
use std::str;
use std::time::Duration;

use curl::easy::Easy;
use tokio::sync::oneshot;

use super::{parse, BodySender, BodyStream, GetRequest, GetResponse, HeadResponse, Transport, CHUNK_SIZE};
use crate::error::TransportError;

/// Chunks buffered between curl and the consumer.
const BODY_CHANNEL_DEPTH: usize = 4;
const MAX_REDIRECTS: u32 = 10;

/// Transport over the `curl` crate.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    user_agent: String,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            user_agent: concat!("adl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn easy(&self, url: &str) -> Result<Easy, TransportError> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.useragent(&self.user_agent)?;
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        Ok(easy)
    }

    fn head_blocking(&self, url: &str, timeout: Duration) -> Result<HeadResponse, TransportError> {
        let mut lines: Vec<String> = Vec::new();
        let mut easy = self.easy(url)?;
        easy.nobody(true)?;
        easy.timeout(timeout)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        let final_url = easy.effective_url()?.unwrap_or(url).to_string();
        Ok(parse::parse_headers(status, final_url, &lines))
    }

    fn get_blocking(
        &self,
        request: &GetRequest,
        head_tx: oneshot::Sender<u32>,
        body_tx: &BodySender,
    ) -> Result<(), TransportError> {
        let mut easy = self.easy(&request.url)?;
        // The caller enforces the stall deadline on each chunk. curl's
        // low-speed check only reclaims this worker once the caller is gone.
        let stall = request.timeout.max(Duration::from_secs(1));
        easy.connect_timeout(request.timeout)?;
        easy.low_speed_limit(1)?;
        easy.low_speed_time(stall)?;
        easy.buffer_size(CHUNK_SIZE)?;
        if request.offset > 0 {
            easy.range(&format!("{}-", request.offset))?;
        }

        let status = Cell::new(0u32);
        let mut head_tx = Some(head_tx);
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Some(code) = str::from_utf8(data).ok().and_then(parse::parse_status_line) {
                    status.set(code);
                }
                true
            })?;
            transfer.write_function(|data| {
                if let Some(tx) = head_tx.take() {
                    let _ = tx.send(status.get());
                }
                match body_tx.blocking_send(Ok(data.to_vec())) {
                    Ok(()) => Ok(data.len()),
                    // consumer went away: returning a short count aborts the transfer
                    Err(_) => Ok(0),
                }
            })?;
            transfer.perform()?;
        }

        if let Some(tx) = head_tx.take() {
            let _ = tx.send(easy.response_code()?);
        }
        Ok(())
    }
}

impl Transport for CurlTransport {
    async fn head(&self, url: &str, timeout: Duration) -> Result<HeadResponse, TransportError> {
        let this = self.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || this.head_blocking(&url, timeout))
            .await
            .map_err(|e| TransportError::Other(format!("probe task join: {e}")))?
    }

    async fn get(&self, request: GetRequest) -> Result<GetResponse, TransportError> {
        let this = self.clone();
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, mut body) = BodyStream::channel(BODY_CHANNEL_DEPTH);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = this.get_blocking(&request, head_tx, &body_tx) {
                let _ = body_tx.blocking_send(Err(e));
            }
        });

        match head_rx.await {
            Ok(status) => Ok(GetResponse { status, body }),
            // The worker quit before a response arrived; its error is queued on the body.
            Err(_) => match body.chunk().await {
                Err(e) => Err(e),
                Ok(_) => Err(TransportError::Other("transfer ended without a response".into())),
            },
        }
    }
}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        let msg = e.to_string();
        if e.is_operation_timedout() {
            return TransportError::Timeout(msg);
        }
        if e.is_couldnt_connect()
            || e.is_couldnt_resolve_host()
            || e.is_couldnt_resolve_proxy()
            || e.is_recv_error()
            || e.is_send_error()
            || e.is_got_nothing()
            || e.is_partial_file()
        {
            return TransportError::Connection(msg);
        }
        if e.is_url_malformed() || e.is_unsupported_protocol() {
            return TransportError::InvalidRequest(msg);
        }
        TransportError::Other(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_scheme_is_invalid_request() {
        let err = CurlTransport::new()
            .head("nosuchscheme://example.com/x", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)), "{err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        // Bind then drop to get a port with nothing listening.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = CurlTransport::new()
            .get(GetRequest {
                url: format!("http://127.0.0.1:{port}/x"),
                offset: 0,
                timeout: Duration::from_secs(2),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)), "{err:?}");
    }
}
