//! Production dialer built on tokio

use crate::error::{AppError, Result};
use crate::transport::Dial;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

/// Upper bound on resolve-plus-connect; hanging forever would not help.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Dialer that resolves a host and connects over TCP.
///
/// Resolution returns both IPv4 and IPv6 addresses and each is attempted
/// in order until one connects. SO_KEEPALIVE is left off and connections
/// are never pooled here; every dial produces a fresh socket, which the
/// timing measurements depend on.
pub struct TokioDialer {
    dial_timeout: Duration,
}

impl TokioDialer {
    /// Create a dialer with the given overall dial timeout.
    pub fn new(dial_timeout: Duration) -> Self {
        Self { dial_timeout }
    }

    async fn resolve_and_connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let addrs: Vec<_> = lookup_host((host, port))
            .await
            .map_err(|e| AppError::dns_resolution(format!("Failed to resolve {}: {}", host, e)))?
            .collect();

        if addrs.is_empty() {
            return Err(AppError::dns_resolution(format!(
                "No addresses resolved for {}",
                host
            )));
        }

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    last_error = Some(AppError::network(format!(
                        "Failed to connect to {}: {}",
                        addr, e
                    )))
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::network(format!("No address of {} was reachable", host))))
    }
}

impl Default for TokioDialer {
    fn default() -> Self {
        Self::new(DEFAULT_DIAL_TIMEOUT)
    }
}

#[async_trait]
impl Dial for TokioDialer {
    async fn dial(&self, host: &str, port: u16) -> Result<TcpStream> {
        match timeout(self.dial_timeout, self.resolve_and_connect(host, port)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::timeout(format!(
                "Dial to {}:{} exceeded {}s",
                host,
                port,
                self.dial_timeout.as_secs()
            ))),
        }
    }
}
