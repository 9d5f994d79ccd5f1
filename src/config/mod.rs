//! Configuration data model and validation

use crate::cli::Cli;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long the probe loop runs.
///
/// The two policies size their histograms differently: a wall-clock run
/// approximates its probe count, a counted run knows it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunLength {
    /// Run until this many minutes of wall-clock time have elapsed
    Minutes(f64),
    /// Run exactly this many probes
    Count(u32),
}

impl RunLength {
    /// Expected number of probes, used to size the sample reservoirs.
    ///
    /// Duration-bounded runs grossly approximate one check per second,
    /// multiplied by ten; an undersized reservoir degrades percentile
    /// accuracy rather than failing.
    pub fn expected_probes(&self) -> usize {
        match self {
            RunLength::Minutes(minutes) => (60.0 * 10.0 * minutes).ceil().max(1.0) as usize,
            RunLength::Count(count) => (*count).max(1) as usize,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target URL to probe
    pub target_url: String,

    /// Run length policy: wall-clock minutes or a fixed probe count
    pub run_length: RunLength,

    /// Delay between probes in milliseconds
    pub frequency_ms: u64,

    /// Enable colored terminal output
    pub enable_color: bool,

    /// Emit the final report as JSON instead of a table
    pub json_output: bool,

    /// Enable verbose output
    pub verbose: bool,

    /// Enable debug output
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: crate::defaults::DEFAULT_URL.to_string(),
            run_length: RunLength::Minutes(crate::defaults::DEFAULT_DURATION_MIN),
            frequency_ms: crate::defaults::DEFAULT_FREQUENCY_MS,
            enable_color: crate::defaults::DEFAULT_ENABLE_COLOR,
            json_output: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Build a configuration from parsed command-line arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        cli.validate().map_err(AppError::validation)?;

        let run_length = match cli.count {
            Some(count) => RunLength::Count(count),
            None => RunLength::Minutes(cli.duration),
        };

        let config = Self {
            target_url: cli.url.clone(),
            run_length,
            frequency_ms: cli.frequency,
            enable_color: !cli.no_color && (cli.color || crate::defaults::DEFAULT_ENABLE_COLOR),
            json_output: cli.json,
            verbose: cli.verbose,
            debug: cli.debug,
        };

        config.validate()?;
        Ok(config)
    }

    /// Inter-probe delay as a Duration.
    pub fn frequency(&self) -> Duration {
        Duration::from_millis(self.frequency_ms)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.target_url.is_empty() {
            return Err(AppError::config("Target URL cannot be empty"));
        }

        let url = url::Url::parse(&self.target_url)
            .map_err(|e| AppError::config(format!("Invalid target URL '{}': {}", self.target_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::config(format!(
                "Target URL '{}' must use http or https",
                self.target_url
            )));
        }
        if url.host_str().is_none() {
            return Err(AppError::config(format!(
                "Target URL '{}' must have a host",
                self.target_url
            )));
        }

        match self.run_length {
            RunLength::Minutes(minutes) if !(minutes > 0.0) => {
                return Err(AppError::config("Run duration must be positive"));
            }
            RunLength::Count(0) => {
                return Err(AppError::config("Probe count must be at least 1"));
            }
            _ => {}
        }

        Ok(())
    }
}
