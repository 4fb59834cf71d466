//! TCP port probing: pure liveness checks, no payload.

use crate::engine::Limiter;
use futures::{stream, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Attempts one TCP connect. Anything but a completed handshake within the
/// timeout counts as closed.
pub async fn check_port(host: &str, port: u16, timeout: Duration) -> bool {
    let address: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(address) => address,
        Err(e) => {
            debug!("unscannable address {}:{}: {}", host, port, e);
            return false;
        }
    };

    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(&address)).await,
        Ok(Ok(_))
    )
}

/// Scans every port against one host, bounded two ways: `per_host` caps the
/// simultaneous connects against this host, the shared limiter caps them
/// across the whole phase. Returns the open ports only; closed ports are
/// never materialized.
pub async fn scan_host(
    host: &str,
    ports: &[u16],
    per_host: usize,
    limiter: &Limiter,
    timeout: Duration,
) -> Vec<u16> {
    stream::iter(ports.iter().copied())
        .map(|port| async move {
            let _permit = limiter.acquire().await;
            if check_port(host, port, timeout).await {
                Some(port)
            } else {
                None
            }
        })
        .buffer_unordered(per_host.max(1))
        .filter_map(|port| async move { port })
        .collect()
        .await
}
