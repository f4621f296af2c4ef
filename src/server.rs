//! Connection Listener
//!
//! Accepts TCP connections and runs one request/response cycle per
//! connection on its own task. A semaphore caps the number of
//! connections in flight; arrivals beyond the cap get a "busy" reply
//! and are closed almost straight away.

use crate::codec;
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::protocol::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const DRAIN_LIMIT: usize = 64 * 1024;
// Turned-away peers only get a moment to finish sending.
const BUSY_DRAIN_TIMEOUT: Duration = Duration::from_millis(100);
const BUSY_DRAIN_LIMIT: usize = 4 * 1024;

pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    config: ServerConfig,
    permits: Arc<Semaphore>,
}

impl Server {
    /// Bind the listener. Invalid limits and failure to bind are
    /// returned to the caller.
    pub async fn bind(config: ServerConfig, dispatcher: Dispatcher) -> Result<Self> {
        config.validate()?;
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        let permits = Arc::new(Semaphore::new(config.max_connections));
        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher),
            config,
            permits,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        loop {
            let (stream, peer) = tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Listener shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        continue;
                    }
                },
            };

            debug!("Connected by {}", peer);

            let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
                warn!("Turning away {}: connection limit reached", peer);
                tokio::spawn(reject_busy(stream));
                continue;
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let config = self.config.clone();
            tokio::spawn(async move {
                handle_connection(stream, &dispatcher, &config).await;
                drop(permit);
            });
        }
    }
}

/// Run one request/response cycle and close the connection.
async fn handle_connection(mut stream: TcpStream, dispatcher: &Dispatcher, config: &ServerConfig) {
    let read = tokio::time::timeout(
        config.read_timeout,
        codec::read_request(&mut stream, config.max_request_bytes),
    )
    .await
    .unwrap_or_else(|_| {
        Err(Error::Timeout(format!(
            "no complete request within {}s",
            config.read_timeout.as_secs_f64()
        )))
    });

    let request = match read {
        Ok(Some(value)) => Request::from_value(value),
        Ok(None) => {
            debug!("Peer closed without sending a request");
            return;
        }
        Err(e) => Err(e),
    };

    let response = dispatcher.handle(request).await;
    if let Err(e) = write_response(&mut stream, &response).await {
        warn!("Failed to write response: {}", e);
        return;
    }
    drain(&mut stream, DRAIN_TIMEOUT, DRAIN_LIMIT).await;
}

async fn reject_busy(mut stream: TcpStream) {
    if let Err(e) = write_response(&mut stream, &Response::busy()).await {
        debug!("Failed to write busy response: {}", e);
        return;
    }
    drain(&mut stream, BUSY_DRAIN_TIMEOUT, BUSY_DRAIN_LIMIT).await;
}

/// Discard whatever the peer is still sending so that closing the
/// socket does not reset the connection before the reply is read.
async fn drain(stream: &mut TcpStream, timeout: Duration, limit: usize) {
    let mut sink = [0u8; 1024];
    let mut total = 0;
    let _ = tokio::time::timeout(timeout, async {
        while total < limit {
            match stream.read(&mut sink).await {
                Ok(0) | Err(_) => break,
                Ok(n) => total += n,
            }
        }
    })
    .await;
}

async fn write_response(stream: &mut TcpStream, response: &Response) -> Result<()> {
    let bytes = response.to_bytes()?;
    stream.write_all(&bytes).await?;
    stream.shutdown().await?;
    Ok(())
}
