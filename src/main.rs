//! checkit - HTTP latency probe CLI

use checkit::{
    cli::Cli,
    config::{Config, RunLength},
    error::{AppError, Result},
    logging::ProbeLogger,
    output::FormatterFactory,
    probe::ProbeRunner,
    PKG_NAME, VERSION,
};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_application(cli).await {
        eprintln!("Error: {}", e);
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    let config = Config::from_cli(&cli)?;
    let logger = ProbeLogger::new(config.debug);

    if config.debug {
        logger.debug(&format!("{} v{}", PKG_NAME, VERSION));
        logger.debug(&format!("Configuration: {:?}", config));
    }

    logger.info(&format!("Checking URL '{}'", config.target_url));
    match config.run_length {
        RunLength::Minutes(minutes) => logger.info(&format!(
            "Running for {:.1} minute(s) at a {} millisecond(s) frequency",
            minutes, config.frequency_ms
        )),
        RunLength::Count(count) => logger.info(&format!(
            "Running {} check(s) at a {} millisecond(s) frequency",
            count, config.frequency_ms
        )),
    }

    let mut runner = ProbeRunner::new(&config)?;

    logger.info("Beginning checks");
    let report = runner.run().await?;
    println!();
    logger.info(&format!("Ending checks at {}", report.completed_at));

    if config.json_output {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::internal(format!("Failed to serialize report: {}", e)))?;
        println!("{}", json);
    } else {
        let formatter = FormatterFactory::create(config.enable_color);
        println!("{}", formatter.format_report(&report));
    }

    if config.verbose {
        logger.info(&format!(
            "Run summary: {} checks between {} and {}",
            report.checks, report.started_at, report.completed_at
        ));
    }

    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Verify the URL format (must start with http:// or https://)");
            eprintln!("  - Duration is in minutes, frequency in milliseconds");
        }
        AppError::Network(_) | AppError::DnsResolution(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Check if the domain exists and resolves");
            eprintln!("  - Test with a different target URL");
        }
        AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Timeout troubleshooting:");
            eprintln!("  - The target may be slow or unreachable from this network");
            eprintln!("  - Try a lower frequency or a different URL");
        }
        _ => {}
    }
}
