//! Timestamped console logging for the probe run
//!
//! Run banners and progress lines go to stderr so the results table on
//! stdout stays clean for piping.

use chrono::Utc;
use std::io::{self, Write};

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug level - detailed information for debugging
    Debug = 0,
    /// Info level - general application information
    Info = 1,
    /// Warning level - potentially harmful situations
    Warn = 2,
    /// Error level - error events
    Error = 3,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Console logger with a level threshold driven by the CLI flags.
pub struct ProbeLogger {
    min_level: LogLevel,
}

impl ProbeLogger {
    /// Create a logger; `--debug` lowers the threshold to Debug.
    pub fn new(debug: bool) -> Self {
        Self {
            min_level: if debug { LogLevel::Debug } else { LogLevel::Info },
        }
    }

    /// Log a message at the given level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut stderr = io::stderr().lock();
        // Failing to log is not worth failing the run over.
        let _ = writeln!(stderr, "{} [{}] {}", timestamp, level.as_str(), message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}
