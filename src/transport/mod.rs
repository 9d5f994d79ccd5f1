//! Instrumented HTTP transport
//!
//! The transport wraps an underlying dialer and an underlying round-trip
//! executor so that connection establishment and the full round trip are
//! independently timed without altering request or response semantics.
//!
//! Sequence of events for one probe:
//!
//!   round_trip_start -> dial_start -> [resolve + connect] -> dial_end
//!     -> [send request] -> [receive response] -> round_trip_end
//!
//! Measurement validity depends on every probe performing a fresh dial:
//! the production executor opens a new connection per request and sends
//! `Connection: close`, so the dial timestamps are never stale.

pub mod dialer;
pub mod executor;

pub use dialer::TokioDialer;
pub use executor::HttpExecutor;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use url::Url;

/// Establishes a transport-layer connection to a host and port.
///
/// Dialing covers address resolution plus TCP connection establishment,
/// and is expected to attempt both IPv4 and IPv6 addresses.
#[async_trait]
pub trait Dial: Send + Sync {
    async fn dial(&self, host: &str, port: u16) -> Result<TcpStream>;
}

/// Executes one full HTTP request/response cycle.
///
/// The executor obtains its connection from the dialer passed into the
/// call, which lets a wrapper intercept the dial step of its own round
/// trip without a self-referential structure.
#[async_trait]
pub trait RoundTrip: Send + Sync {
    async fn round_trip(&self, request: &ProbeRequest, dialer: &dyn Dial) -> Result<ProbeResponse>;
}

/// A single HTTP GET probe target.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    url: Url,
}

impl ProbeRequest {
    /// Parse and validate a probe target URL.
    pub fn get(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(AppError::validation(format!(
                    "Unsupported URL scheme '{}', expected http or https",
                    other
                )))
            }
        }
        if url.host_str().is_none() {
            return Err(AppError::validation("URL must have a host"));
        }
        Ok(Self { url })
    }

    /// Full target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host component of the target URL.
    pub fn host(&self) -> &str {
        // Presence is checked at construction
        self.url.host_str().unwrap_or_default()
    }

    /// Port, falling back to the scheme default.
    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(80)
    }

    /// Whether the request requires a TLS handshake.
    pub fn is_tls(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Request target for the HTTP request line (path plus query).
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Value for the Host header, including the port when non-default.
    pub fn authority(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }
}

/// Response summary from one completed round trip.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// HTTP status code received
    pub status: u16,
    /// Number of response headers
    pub header_count: usize,
    /// Size of the fully received response body in bytes
    pub body_bytes: usize,
}

impl ProbeResponse {
    /// Whether the status code indicates success.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// The four timestamps recorded for the request currently in flight.
///
/// Fields are unconditionally overwritten on every request, so no reset
/// is needed between probes.
#[derive(Debug, Clone, Copy, Default)]
struct PhaseMarks {
    dial_start: Option<Instant>,
    dial_end: Option<Instant>,
    round_trip_start: Option<Instant>,
    round_trip_end: Option<Instant>,
}

/// Internal dialer wrapper that stamps dial start/end around the
/// underlying dial, success or failure alike.
struct TimedDial {
    inner: Arc<dyn Dial>,
    marks: Arc<Mutex<PhaseMarks>>,
}

#[async_trait]
impl Dial for TimedDial {
    async fn dial(&self, host: &str, port: u16) -> Result<TcpStream> {
        stamp(&self.marks, |m, now| m.dial_start = Some(now));
        let result = self.inner.dial(host, port).await;
        stamp(&self.marks, |m, now| m.dial_end = Some(now));
        result
    }
}

fn stamp(marks: &Mutex<PhaseMarks>, apply: impl FnOnce(&mut PhaseMarks, Instant)) {
    let now = Instant::now();
    let mut guard = marks.lock().unwrap_or_else(PoisonError::into_inner);
    apply(&mut guard, now);
}

/// A transport that times the dial step and the round-trip step of each
/// request it executes.
///
/// Exactly one request may be in flight per instance at a time; the
/// driver upholds that invariant, the transport does not enforce it.
/// Overlapping requests on the same instance would interleave the
/// timestamps and corrupt the derived durations.
pub struct TimedTransport {
    dialer: TimedDial,
    executor: Box<dyn RoundTrip>,
    marks: Arc<Mutex<PhaseMarks>>,
}

impl TimedTransport {
    /// Wrap an underlying dialer and round-trip executor.
    pub fn new(dialer: Arc<dyn Dial>, executor: Box<dyn RoundTrip>) -> Self {
        let marks = Arc::new(Mutex::new(PhaseMarks::default()));
        Self {
            dialer: TimedDial {
                inner: dialer,
                marks: Arc::clone(&marks),
            },
            executor,
            marks,
        }
    }

    /// Production transport: dual-stack tokio dialer with a bounded dial
    /// timeout, and a hyper executor with a bounded TLS handshake timeout
    /// that opens a fresh connection per request.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(
            Arc::new(TokioDialer::default()),
            Box::new(HttpExecutor::new()?),
        ))
    }

    /// Execute one GET probe, timing the round trip and any dial the
    /// executor performs within it. Errors from the underlying layers
    /// propagate unchanged; nothing is retried.
    pub async fn round_trip(&self, request: &ProbeRequest) -> Result<ProbeResponse> {
        stamp(&self.marks, |m, now| m.round_trip_start = Some(now));
        let result = self.executor.round_trip(request, &self.dialer).await;
        stamp(&self.marks, |m, now| m.round_trip_end = Some(now));
        result
    }

    /// Time spent establishing the connection: dial end minus dial start.
    /// Valid only after at least one completed dial.
    pub fn connect_duration(&self) -> Duration {
        let marks = self.marks();
        span(marks.dial_start, marks.dial_end)
    }

    /// Everything after the connection was established: request
    /// transmission, server processing and response transmission.
    pub fn send_wait_receive_duration(&self) -> Duration {
        let marks = self.marks();
        span(marks.dial_end, marks.round_trip_end)
    }

    /// The full request lifecycle as seen by the caller.
    pub fn round_trip_duration(&self) -> Duration {
        let marks = self.marks();
        span(marks.round_trip_start, marks.round_trip_end)
    }

    fn marks(&self) -> PhaseMarks {
        *self.marks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn set_marks(
        &self,
        round_trip_start: Instant,
        dial_start: Instant,
        dial_end: Instant,
        round_trip_end: Instant,
    ) {
        let mut guard = self.marks.lock().unwrap_or_else(PoisonError::into_inner);
        guard.round_trip_start = Some(round_trip_start);
        guard.dial_start = Some(dial_start);
        guard.dial_end = Some(dial_end);
        guard.round_trip_end = Some(round_trip_end);
    }
}

/// Saturating duration between two optional marks; zero when either mark
/// is missing or the clock ordering was violated.
fn span(start: Option<Instant>, end: Option<Instant>) -> Duration {
    match (start, end) {
        (Some(start), Some(end)) => end.saturating_duration_since(start),
        _ => Duration::ZERO,
    }
}
