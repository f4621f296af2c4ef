//! Request framing
//!
//! A request is exactly one JSON value. Bytes are accumulated until
//! they hold a complete value, the peer shuts down its write half, or
//! the configured size bound is crossed. Oversized, malformed and
//! truncated payloads all surface as [`Error::Parse`], as does
//! anything but whitespace after the value.

use crate::error::{Error, Result};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 1024;

/// Read one JSON request from `reader`.
///
/// Returns `Ok(None)` if the peer closed the connection without
/// sending anything.
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> Result<Option<Value>> {
    let mut buf = Vec::with_capacity(max_bytes.min(CHUNK_SIZE));
    let mut chunk = [0u8; CHUNK_SIZE];

    loop {
        // Never read more than one byte past the limit.
        let want = (max_bytes - buf.len()).saturating_add(1).min(CHUNK_SIZE);
        let n = reader.read(&mut chunk[..want]).await?;

        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return serde_json::from_slice(&buf)
                .map(Some)
                .map_err(|e| Error::Parse(e.to_string()));
        }

        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > max_bytes {
            return Err(Error::Parse(format!("request exceeds {max_bytes} bytes")));
        }

        if let Some(value) = try_complete(&buf)? {
            return Ok(Some(value));
        }
    }
}

/// Parse the JSON value in `buf` if it is already complete.
fn try_complete(buf: &[u8]) -> Result<Option<Value>> {
    let mut values = serde_json::Deserializer::from_slice(buf).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => {
            if buf[values.byte_offset()..].iter().all(u8::is_ascii_whitespace) {
                Ok(Some(value))
            } else {
                Err(Error::Parse("trailing characters after request".to_string()))
            }
        }
        Some(Err(e)) if e.is_eof() => Ok(None),
        Some(Err(e)) => Err(Error::Parse(e.to_string())),
        None => Ok(None),
    }
}
