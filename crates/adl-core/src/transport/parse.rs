//! Parse raw HTTP response header lines.

use super::HeadResponse;

/// Status code from a status line such as `HTTP/1.1 206 Partial Content`.
pub fn parse_status_line(line: &str) -> Option<u32> {
    let mut parts = line.trim().split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Builds a [`HeadResponse`] from collected header lines.
///
/// With redirects followed, curl reports every response's headers in order;
/// each status line starts a new block and only the last block counts.
pub fn parse_headers(status: u32, url: String, lines: &[String]) -> HeadResponse {
    let mut head = HeadResponse {
        status,
        url,
        content_length: None,
        accept_ranges: false,
        content_disposition: None,
    };

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if parse_status_line(line).is_some() {
            head.content_length = None;
            head.accept_ranges = false;
            head.content_disposition = None;
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            head.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            head.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("content-disposition") {
            head.content_disposition = Some(value.to_string());
        }
    }

    head
}
