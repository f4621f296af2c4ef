//! One-shot relay client
//!
//! Sends a single request and waits for the reply, the same way any
//! other client of the relay would.

use crate::error::{Error, Result};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Send `payload` to the relay at `addr` and return the decoded reply.
pub async fn send_request<A: ToSocketAddrs>(addr: A, payload: &[u8]) -> Result<Value> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(payload).await?;
    stream.shutdown().await?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;

    serde_json::from_slice(&reply)
        .map_err(|e| Error::Parse(format!("invalid reply ({} bytes): {e}", reply.len())))
}
