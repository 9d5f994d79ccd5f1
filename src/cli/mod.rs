//! Command-line interface

use clap::Parser;

/// checkit - measures HTTP GET latency phases against a URL and reports
/// percentile summaries
#[derive(Parser, Debug, Clone)]
#[command(name = "checkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// URL to check
    #[arg(long, default_value = crate::defaults::DEFAULT_URL)]
    pub url: String,

    /// How long to run the check for (in minutes)
    #[arg(short, long, allow_negative_numbers = true, default_value_t = crate::defaults::DEFAULT_DURATION_MIN)]
    pub duration: f64,

    /// Run a fixed number of checks instead of a wall-clock duration
    #[arg(short, long, conflicts_with = "duration")]
    pub count: Option<u32>,

    /// Delay between checks (in milliseconds)
    #[arg(short, long, default_value_t = crate::defaults::DEFAULT_FREQUENCY_MS)]
    pub frequency: u64,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Print the results as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.duration <= 0.0 {
            return Err("Duration must be a positive number of minutes".to_string());
        }

        if let Some(0) = self.count {
            return Err("Count must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("checkit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.url, "https://gitlab.com");
        assert!((cli.duration - 5.0).abs() < f64::EPSILON);
        assert_eq!(cli.count, None);
        assert_eq!(cli.frequency, 500);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_count_conflicts_with_duration() {
        let result = Cli::try_parse_from(["checkit", "--count", "10", "--duration", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_count_alone_is_accepted() {
        let cli = parse(&["--count", "10"]);
        assert_eq!(cli.count, Some(10));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_json_flag() {
        let cli = parse(&["--json", "--count", "2"]);
        assert!(cli.json);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_color_conflict_rejected() {
        let cli = parse(&["--color", "--no-color"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_zero_count_rejected() {
        let cli = parse(&["--count", "0"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let cli = parse(&["--duration", "-1"]);
        assert!(cli.validate().is_err());
    }
}
