//! Report formatting and display
//!
//! Renders the four-phase results table. The probe core only exposes
//! plain numeric summaries; everything about presentation lives here.

use crate::probe::ProbeReport;
use crate::stats::HistogramSummary;
use colored::Colorize;

/// Formats a completed probe report for the console.
pub trait ReportFormatter {
    fn format_report(&self, report: &ProbeReport) -> String;
}

/// Row labels, in display order.
const PHASE_LABELS: [&str; 4] = [
    "Establish connection ",
    "Send, wait, receive  ",
    "Round trip           ",
    "HTTP GET (i.e. total)",
];

fn phases(report: &ProbeReport) -> [(&'static str, &HistogramSummary); 4] {
    [
        (PHASE_LABELS[0], &report.connect),
        (PHASE_LABELS[1], &report.send_wait_receive),
        (PHASE_LABELS[2], &report.round_trip),
        (PHASE_LABELS[3], &report.total),
    ]
}

fn format_row(summary: &HistogramSummary) -> String {
    format!(
        "Min {} \t Mean {:.2} \t Max {} \t P75 {:.2} \t P99 {:.2} (ms)",
        summary.min, summary.mean, summary.max, summary.p75, summary.p99
    )
}

/// Plain text formatter for scripts and logs
pub struct PlainFormatter;

impl ReportFormatter for PlainFormatter {
    fn format_report(&self, report: &ProbeReport) -> String {
        let mut out = String::new();
        out.push_str("*** RESULTS (in milliseconds) ***\n");
        out.push_str(&format!(
            "Performed {} checks against {}\n",
            report.checks, report.url
        ));
        for (label, summary) in phases(report) {
            out.push_str(&format!("{} \t {}\n", label, format_row(summary)));
        }
        out
    }
}

/// Colored terminal formatter
pub struct ColoredFormatter;

impl ReportFormatter for ColoredFormatter {
    fn format_report(&self, report: &ProbeReport) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{}\n",
            "*** RESULTS (in milliseconds) ***".green().bold()
        ));
        out.push_str(&format!(
            "Performed {} checks against {}\n",
            report.checks.to_string().bold(),
            report.url.cyan()
        ));
        for (label, summary) in phases(report) {
            out.push_str(&format!("{} \t {}\n", label.cyan(), format_row(summary)));
        }
        out
    }
}

/// Output formatting factory keyed on color preference
pub struct FormatterFactory;

impl FormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create(enable_color: bool) -> Box<dyn ReportFormatter> {
        if enable_color {
            Box::new(ColoredFormatter)
        } else {
            Box::new(PlainFormatter)
        }
    }
}
