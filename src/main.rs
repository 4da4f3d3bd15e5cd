use anyhow::Result;
use clap::{Parser, Subcommand};
use proxy_checker::{
    config::Settings,
    proxy::{
        output::{self, DetailedReport},
        ProxyParser, ProxyValidator, RunReport,
    },
};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A concurrent proxy validator with retries and speed filtering
#[derive(Parser)]
#[command(name = "proxy-checker")]
#[command(about = "A concurrent proxy validator with retries and speed filtering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxies and save the working ones
    Check {
        /// Input file containing proxies (defaults to proxy_file from the config)
        input: Option<PathBuf>,
        /// Configuration file
        #[arg(short, long, default_value_os_t = Settings::default_path())]
        config: PathBuf,
        /// Output file for working proxies
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output file for the JSON details report
        #[arg(short, long)]
        details: Option<PathBuf>,
        /// Number of concurrent checks
        #[arg(short = 'n', long)]
        threads: Option<usize>,
        /// Timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Additional attempts for failed proxies
        #[arg(short, long)]
        retries: Option<u32>,
        /// URL to test proxies against (can specify multiple)
        #[arg(long)]
        test_url: Vec<String>,
    },
    /// Parse proxies from a file
    Parse {
        /// Input file containing proxies
        input: PathBuf,
        /// Output file for parsed proxies
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Log filter from `RUST_LOG`, falling back to warn; `--verbose` forces debug
fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn setup_logging(verbose: bool) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(verbose, directives.as_deref()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            input,
            config,
            output,
            details,
            threads,
            timeout,
            retries,
            test_url,
        } => {
            let mut settings = Settings::load_or_default(&config);
            if let Some(path) = input {
                settings.proxy_file = path;
            }
            if let Some(path) = output {
                settings.output_file = path;
            }
            if details.is_some() {
                settings.details_file = details;
            }
            if let Some(threads) = threads {
                settings.concurrent_checks = threads;
            }
            if let Some(timeout) = timeout {
                settings.timeout = timeout;
            }
            if let Some(retries) = retries {
                settings.retry_count = retries;
            }
            if !test_url.is_empty() {
                settings.test_urls = test_url;
            }

            check(&settings).await?;
        }
        Commands::Parse { input, output } => {
            let parsed = ProxyParser::parse_file(&input)?;

            println!("Parsed {} proxies from {:?}", parsed.proxies.len(), input);
            for rejected in &parsed.rejected {
                eprintln!(
                    "Skipping line {}: {:?} ({})",
                    rejected.line_number, rejected.content, rejected.error
                );
            }

            let urls: Vec<String> = parsed.proxies.iter().map(|p| p.url()).collect();
            if let Some(output_path) = output {
                output::save_working_set(&output_path, &urls)?;
                println!("Saved parsed proxies to {:?}", output_path);
            } else {
                for url in &urls {
                    println!("{}", url);
                }
            }
        }
    }

    Ok(())
}

async fn check(settings: &Settings) -> Result<()> {
    let run_config = settings.run_configuration();
    let validator = ProxyValidator::new(run_config)?;

    let parsed = ProxyParser::parse_file(&settings.proxy_file)?;
    println!(
        "Loaded {} proxies from {:?}",
        parsed.proxies.len(),
        settings.proxy_file
    );
    for rejected in &parsed.rejected {
        eprintln!(
            "Skipping line {}: {:?} ({})",
            rejected.line_number, rejected.content, rejected.error
        );
    }
    if parsed.proxies.is_empty() {
        println!("No proxies found for checking.");
        return Ok(());
    }

    let config = validator.config();
    println!(
        "Checking with {} concurrent checks, timeout: {:?}, retries: {}",
        config.concurrency_limit, config.per_check_timeout, config.retry_count
    );
    println!("Test URLs: {}", config.test_targets.join(", "));
    if config.speed_filter.enabled {
        println!(
            "Speed filter: {:?} - {:?}",
            config.speed_filter.min_latency, config.speed_filter.max_latency
        );
    }
    println!();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let validator = validator.with_progress(tx);
    let printer = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            let pass = if update.attempt == 1 {
                String::from("Progress")
            } else {
                format!("Retry {}", update.attempt - 1)
            };
            println!(
                "{}: {}/{} ({}%)",
                pass,
                update.completed,
                update.total,
                update.percent()
            );
        }
    });

    let report = validator.validate_parsed(parsed).await;
    // Closing the last sender ends the printer
    drop(validator);
    printer.await?;

    print_report(&report);

    for working_path in settings.working_set_paths() {
        output::save_working_set(working_path, &report.working)?;
        println!(
            "Saved {} working proxies to {:?}",
            report.working.len(),
            working_path
        );
    }

    if let Some(details_path) = &settings.details_file {
        output::save_details(details_path, &DetailedReport::from_run(&report))?;
        println!("Saved proxy details to {:?}", details_path);
    }

    info!("check complete");
    Ok(())
}

fn print_report(report: &RunReport) {
    let summary = &report.summary;
    println!("\nResults of the check:");
    println!("Total proxies: {}", summary.total_input);
    println!("Working proxies: {}", summary.working);
    println!("Not working proxies: {}", summary.failing);
    if summary.excluded_by_speed_filter > 0 {
        println!(
            "Excluded by speed filter: {}",
            summary.excluded_by_speed_filter
        );
    }
    if summary.rejected_lines > 0 {
        println!("Unparseable lines: {}", summary.rejected_lines);
    }
    println!(
        "Speed: {} fast, {} medium, {} slow",
        summary.fast, summary.medium, summary.slow
    );

    if !report.details.is_empty() {
        println!("\nWorking proxies:");
        for record in &report.details {
            if let Some(ms) = record.final_outcome.latency_ms() {
                println!("  {} ({}ms, {})", record.endpoint, ms, record.speed_category);
            }
        }
    }
}
