use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::application::services::ClientRegistry;
use crate::domain::value_objects::ClientId;

/// Upper bound on the request head; anything longer is dropped
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// How long a client may take to present its request head
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts HTTP connections and turns them into registered stream clients.
///
/// Every request gets the same HTTP/1.0 response: status 200, the
/// configured content type, no length or framing. Once the headers have
/// been flushed the raw transport is detached from the request handling and
/// handed to the registry, which owns it from then on; the body is whatever
/// the fan-out pushes until the registry closes the socket.
pub struct HttpFrontDoor {
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    content_type: String,
    next_client_id: Arc<AtomicU64>,
}

impl HttpFrontDoor {
    pub async fn bind(
        port: u16,
        content_type: String,
        registry: Arc<ClientRegistry>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        tracing::info!(port, "listening for incoming HTTP requests");

        Ok(Self {
            listener,
            registry,
            content_type,
            next_client_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the shutdown future resolves.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, closing front door");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => self.handle_connection(socket, peer),
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer: SocketAddr) {
        let registry = self.registry.clone();
        let content_type = self.content_type.clone();
        let id = ClientId::new(self.next_client_id.fetch_add(1, Ordering::Relaxed));

        tokio::spawn(async move {
            // A failed request only affects this connection
            if let Err(e) = handle_request(socket, peer, id, &content_type, registry).await {
                tracing::debug!(%peer, error = %e, "request dropped");
            }
        });
    }
}

async fn handle_request(
    mut socket: TcpStream,
    peer: SocketAddr,
    id: ClientId,
    content_type: &str,
    registry: Arc<ClientRegistry>,
) -> std::io::Result<()> {
    tokio::time::timeout(REQUEST_TIMEOUT, read_request_head(&mut socket))
        .await
        .map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::TimedOut, "request head timed out")
        })??;

    // Open-ended response: no Content-Length, the body ends when the
    // server closes the socket.
    let head = format!(
        "HTTP/1.0 200 OK\r\n\
         Server: pipeline-http/{}\r\n\
         Connection: close\r\n\
         Content-Type: {}\r\n\
         \r\n",
        env!("CARGO_PKG_VERSION"),
        content_type
    );
    socket.write_all(head.as_bytes()).await?;
    socket.flush().await?;

    // Headers are on the wire; detach the transport and register the viewer
    registry.add(id, socket, peer);
    Ok(())
}

/// Read the request head (request line + headers) and check it is a
/// plausible HTTP request. Every request is answered with the one stream,
/// so there is no dispatch on method or path.
async fn read_request_head(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut head = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];

    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before request head",
            ));
        }
        head.extend_from_slice(&chunk[..n]);

        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if head.len() > MAX_REQUEST_HEAD {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
    }

    validate_request_line(&head)
}

fn validate_request_line(head: &[u8]) -> std::io::Result<()> {
    let line_end = head
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(head.len());
    let line = String::from_utf8_lossy(&head[..line_end]);

    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("");
    let version = parts.next().unwrap_or("");

    if method.is_empty()
        || !method.chars().all(|c| c.is_ascii_alphabetic())
        || target.is_empty()
        || !version.starts_with("HTTP/")
    {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "malformed request line",
        ));
    }
    Ok(())
}
