//! Production round-trip executor built on hyper

use crate::error::{AppError, Result};
use crate::transport::{Dial, ProbeRequest, ProbeResponse, RoundTrip};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::Request;
use hyper_rustls::ConfigBuilderExt;
use hyper_util::rt::TokioIo;
use rustls::ClientConfig;
use rustls_pki_types::ServerName;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

/// Upper bound on the TLS handshake; reasonable for this scenario.
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("checkit/", env!("CARGO_PKG_VERSION"));

/// Round-trip executor that performs one HTTP/1.1 GET per call over a
/// connection obtained from the supplied dialer.
///
/// Connections are never reused: each round trip dials afresh and sends
/// `Connection: close`, so connect timing is measured on every probe
/// instead of silently collapsing to near-zero on a pooled connection.
pub struct HttpExecutor {
    tls_config: Arc<ClientConfig>,
    tls_handshake_timeout: Duration,
}

impl HttpExecutor {
    /// Create an executor using the platform's native root certificates.
    pub fn new() -> Result<Self> {
        let tls_config = ClientConfig::builder()
            .with_native_roots()
            .map_err(|e| AppError::internal(format!("Failed to load native TLS roots: {}", e)))?
            .with_no_client_auth();

        Ok(Self {
            tls_config: Arc::new(tls_config),
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
        })
    }

    /// Create an executor with an explicit TLS configuration, used by
    /// tests to avoid touching the platform certificate store.
    pub fn with_tls_config(tls_config: Arc<ClientConfig>) -> Self {
        Self {
            tls_config,
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
        }
    }

    /// Override the TLS handshake timeout.
    pub fn with_tls_handshake_timeout(mut self, tls_handshake_timeout: Duration) -> Self {
        self.tls_handshake_timeout = tls_handshake_timeout;
        self
    }

    fn build_request(&self, request: &ProbeRequest) -> Result<Request<Empty<Bytes>>> {
        Request::builder()
            .method(hyper::Method::GET)
            .uri(request.target())
            .header(hyper::header::HOST, request.authority())
            .header(hyper::header::USER_AGENT, USER_AGENT)
            .header(hyper::header::CONNECTION, "close")
            .body(Empty::new())
            .map_err(|e| AppError::internal(format!("Failed to build request: {}", e)))
    }

    /// Handshake HTTP/1.1 over the given stream, send the request and
    /// receive the response body to completion.
    async fn exchange<S>(&self, stream: S, request: &ProbeRequest) -> Result<ProbeResponse>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| AppError::http_request(format!("HTTP handshake failed: {}", e)))?;

        // The connection task finishes on its own once the server closes
        // the connection we asked it to close.
        tokio::task::spawn(async move {
            let _ = conn.await;
        });

        let req = self.build_request(request)?;
        let response = sender
            .send_request(req)
            .await
            .map_err(|e| AppError::http_request(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let header_count = response.headers().len();

        // Receiving the body to completion is part of the round trip.
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| AppError::http_request(format!("Failed to read response body: {}", e)))?
            .to_bytes();

        Ok(ProbeResponse {
            status,
            header_count,
            body_bytes: body.len(),
        })
    }
}

#[async_trait]
impl RoundTrip for HttpExecutor {
    async fn round_trip(&self, request: &ProbeRequest, dialer: &dyn Dial) -> Result<ProbeResponse> {
        let stream = dialer.dial(request.host(), request.port()).await?;

        if request.is_tls() {
            let server_name = ServerName::try_from(request.host().to_string())
                .map_err(|_| AppError::validation(format!("Invalid TLS name: {}", request.host())))?;
            let connector = tokio_rustls::TlsConnector::from(Arc::clone(&self.tls_config));

            let tls_stream = match timeout(
                self.tls_handshake_timeout,
                connector.connect(server_name, stream),
            )
            .await
            {
                Ok(Ok(tls_stream)) => tls_stream,
                Ok(Err(e)) => {
                    return Err(AppError::network(format!("TLS handshake failed: {}", e)))
                }
                Err(_) => {
                    return Err(AppError::timeout(format!(
                        "TLS handshake exceeded {}s",
                        self.tls_handshake_timeout.as_secs()
                    )))
                }
            };

            self.exchange(tls_stream, request).await
        } else {
            self.exchange(stream, request).await
        }
    }
}
