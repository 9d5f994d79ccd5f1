//! Probe driver loop
//!
//! Owns one [`TimedTransport`] and four latency histograms, issues one
//! GET per iteration and feeds every histogram from the transport's
//! phase durations. A failed probe is fatal to the whole run: the error
//! propagates and no summary is produced.

use crate::config::{Config, RunLength};
use crate::error::Result;
use crate::stats::{capacity_for_probes, HistogramSummary, LatencyHistogram};
use crate::transport::{ProbeRequest, TimedTransport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Final report of a completed run, all durations in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// URL that was probed
    pub url: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run completed
    pub completed_at: DateTime<Utc>,
    /// Number of checks performed
    pub checks: u64,
    /// Connection establishment phase
    pub connect: HistogramSummary,
    /// Send, wait and receive phase
    pub send_wait_receive: HistogramSummary,
    /// Full round trip as seen by the transport
    pub round_trip: HistogramSummary,
    /// The whole GET call as seen by the driver
    pub total: HistogramSummary,
}

/// Single-threaded probe loop: issue a GET, block until it completes,
/// record the four durations, sleep, repeat.
pub struct ProbeRunner {
    transport: TimedTransport,
    request: ProbeRequest,
    run_length: RunLength,
    frequency: Duration,
    show_progress: bool,
    total: LatencyHistogram,
    connect: LatencyHistogram,
    send_wait_receive: LatencyHistogram,
    round_trip: LatencyHistogram,
}

impl ProbeRunner {
    /// Create a runner from validated configuration, using the production
    /// transport.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = TimedTransport::with_defaults()?;
        let request = ProbeRequest::get(&config.target_url)?;
        Ok(Self::build(
            transport,
            request,
            config.run_length.clone(),
            config.frequency(),
            true,
        ))
    }

    /// Create a runner around an explicit transport, used by tests to
    /// substitute dialers and executors.
    pub fn with_transport(
        transport: TimedTransport,
        request: ProbeRequest,
        run_length: RunLength,
        frequency: Duration,
    ) -> Self {
        Self::build(transport, request, run_length, frequency, false)
    }

    fn build(
        transport: TimedTransport,
        request: ProbeRequest,
        run_length: RunLength,
        frequency: Duration,
        show_progress: bool,
    ) -> Self {
        let capacity =
            capacity_for_probes(run_length.expected_probes()).unwrap_or(1);
        Self {
            transport,
            request,
            run_length,
            frequency,
            show_progress,
            total: LatencyHistogram::new("total", capacity),
            connect: LatencyHistogram::new("connect", capacity),
            send_wait_receive: LatencyHistogram::new("send_wait_receive", capacity),
            round_trip: LatencyHistogram::new("round_trip", capacity),
        }
    }

    /// Number of samples recorded so far; useful after a fatal error to
    /// confirm the failed probe contributed nothing.
    pub fn samples_recorded(&self) -> u64 {
        self.total.count()
    }

    /// Run the probe loop to completion and summarize the histograms.
    ///
    /// Any transport error aborts the run immediately; the partial
    /// histograms are not reported.
    pub async fn run(&mut self) -> Result<ProbeReport> {
        let started_at = Utc::now();
        let loop_start = Instant::now();
        let mut iterations: u64 = 0;

        while self.keep_running(loop_start, iterations) {
            if self.show_progress {
                print!(".");
                let _ = io::stdout().flush();
            }

            let probe_start = Instant::now();
            self.transport.round_trip(&self.request).await?;
            let total = probe_start.elapsed();

            self.total.record(total);
            self.connect.record(self.transport.connect_duration());
            self.send_wait_receive
                .record(self.transport.send_wait_receive_duration());
            self.round_trip.record(self.transport.round_trip_duration());

            iterations += 1;
            if !self.frequency.is_zero() {
                sleep(self.frequency).await;
            }
        }

        Ok(ProbeReport {
            url: self.request.url().to_string(),
            started_at,
            completed_at: Utc::now(),
            checks: self.total.count(),
            connect: self.connect.summary(),
            send_wait_receive: self.send_wait_receive.summary(),
            round_trip: self.round_trip.summary(),
            total: self.total.summary(),
        })
    }

    fn keep_running(&self, loop_start: Instant, iterations: u64) -> bool {
        match self.run_length {
            RunLength::Minutes(minutes) => {
                loop_start.elapsed().as_secs_f64() / 60.0 < minutes
            }
            RunLength::Count(count) => iterations < u64::from(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpExecutor, TokioDialer};
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_transport() -> TimedTransport {
        TimedTransport::new(
            Arc::new(TokioDialer::default()),
            Box::new(HttpExecutor::with_tls_config(Arc::new(
                rustls::ClientConfig::builder()
                    .with_root_certificates(rustls::RootCertStore::empty())
                    .with_no_client_auth(),
            ))),
        )
    }

    #[tokio::test]
    async fn test_counted_run_records_every_phase() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let request = ProbeRequest::get(&server.uri()).unwrap();
        let mut runner = ProbeRunner::with_transport(
            test_transport(),
            request,
            RunLength::Count(3),
            Duration::ZERO,
        );

        let report = runner.run().await.unwrap();
        assert_eq!(report.checks, 3);
        assert_eq!(report.total.count, 3);
        assert_eq!(report.connect.count, 3);
        assert_eq!(report.send_wait_receive.count, 3);
        assert_eq!(report.round_trip.count, 3);
        assert!(report.total.min <= report.total.max);
        assert!(report.completed_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_failed_probe_is_fatal_and_records_nothing() {
        // A freshly closed local port: the dial is refused.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let request = ProbeRequest::get(&format!("http://127.0.0.1:{}/", port)).unwrap();
        let mut runner = ProbeRunner::with_transport(
            test_transport(),
            request,
            RunLength::Count(5),
            Duration::ZERO,
        );

        assert!(runner.run().await.is_err());
        assert_eq!(runner.samples_recorded(), 0);
    }

    #[tokio::test]
    async fn test_duration_run_stops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let request = ProbeRequest::get(&server.uri()).unwrap();
        // Two thousandths of a minute is 120ms of wall clock.
        let mut runner = ProbeRunner::with_transport(
            test_transport(),
            request,
            RunLength::Minutes(0.002),
            Duration::from_millis(10),
        );

        let report = runner.run().await.unwrap();
        assert!(report.checks >= 1);
    }
}
