// src/main.rs

mod analyzer;
mod cli;
mod discover;
mod error;
mod extract;
mod model;
mod report;
mod source;

use clap::Parser;
use cli::Args;
use error::ChronicleError;
use model::{Config, RunSummary};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<(), ChronicleError> {
    let config = args.into_config()?;
    let start_time = Instant::now();

    info!(
        "Collecting commits ({}) by {}",
        config.range,
        config.usernames.names().join(", ")
    );

    let source = source::for_backend(config.backend, &config.git_binary);
    let result = analyzer::analyze(&config, source.as_ref())?;
    info!("Analysis finished in {:.2?}", start_time.elapsed());

    let written = report::write_report(&config.output, result.records, config.order).map_err(
        |source| ChronicleError::Report {
            path: config.output.clone(),
            source,
        },
    )?;

    print_summary(&config, &result.summary, written);
    info!("Total time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn print_summary(config: &Config, summary: &RunSummary, written: usize) {
    println!("=== Summary ===");
    println!(
        "Repositories: {} found, {} scanned, {} skipped",
        summary.repositories_found, summary.repositories_scanned, summary.repositories_skipped
    );
    if summary.unreadable_dirs > 0 {
        println!("Unreadable directories: {}", summary.unreadable_dirs);
    }
    if summary.malformed_lines + summary.bad_dates > 0 {
        println!(
            "Skipped log entries: {} malformed, {} with bad dates",
            summary.malformed_lines, summary.bad_dates
        );
    }
    println!(
        "All unique authors found across repositories: {}",
        summary.authors.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!("Configured usernames: {}", config.usernames.names().join(", "));
    println!("Commits matched: {}", summary.commits_matched);
    if !summary.matched_authors.is_empty() {
        println!(
            "Matched as: {}",
            summary.matched_authors.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    if written == 0 {
        println!("No commits found for the configured usernames.");
        println!("Check that they match one of the authors listed above.");
    }
    println!("Report written to {}", config.output.display());
}
