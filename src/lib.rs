//! checkit
//!
//! An HTTP latency probe: repeatedly issues GET requests against a
//! configured URL, times connection establishment, send/wait/receive
//! and the full round trip for every request, and reports min, mean,
//! max and percentile summaries per phase.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod probe;
pub mod stats;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, RunLength};
pub use error::{AppError, Result};
pub use probe::{ProbeReport, ProbeRunner};
pub use stats::{HistogramSummary, LatencyHistogram, UniformSample};
pub use transport::{ProbeRequest, ProbeResponse, TimedTransport};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    pub const DEFAULT_URL: &str = "https://gitlab.com";
    pub const DEFAULT_DURATION_MIN: f64 = 5.0;
    pub const DEFAULT_FREQUENCY_MS: u64 = 500;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
