//! Sitewalk main entry point
//!
//! This is the command-line interface for the Sitewalk same-host crawler.

use anyhow::Context;
use clap::Parser;
use sitewalk::config::{compute_config_hash, parse_config_file, validate, Config};
use sitewalk::output::{
    format_page_line, generate_markdown_summary, print_statistics, CrawlReport, CrawlStatistics,
};
use sitewalk::{parse_seed_url, Crawler};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sitewalk: a bounded, same-host web crawler
///
/// Sitewalk starts from one URL, follows every link that stays on the same
/// host and prints the in-scope links found on each page, followed by the
/// pages that could not be fetched.
#[derive(Parser, Debug)]
#[command(name = "sitewalk")]
#[command(version)]
#[command(about = "A bounded, same-host web crawler", long_about = None)]
struct Cli {
    /// Seed URL to start crawling from
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-request HTTP timeout in seconds
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Fetch attempts per page
    #[arg(short, long)]
    retries: Option<u32>,

    /// Maximum number of queued pages (unbounded by default)
    #[arg(long, value_name = "N")]
    queue_capacity: Option<usize>,

    /// Stop the whole crawl after this many seconds
    #[arg(long, value_name = "SECONDS")]
    max_duration: Option<u64>,

    /// Write a markdown summary to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Print crawl statistics after the results
    #[arg(long)]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line flags on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.crawler.seed_url = Some(url.clone());
        }
        if let Some(workers) = self.workers {
            config.crawler.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.crawler.fetch_timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.crawler.max_retries = retries;
        }
        if let Some(capacity) = self.queue_capacity {
            config.crawler.queue_capacity = Some(capacity);
        }
        if let Some(summary) = &self.summary {
            config.output.summary_path = Some(summary.display().to_string());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(&cli)?;
    let seed_url = config
        .crawler
        .seed_url
        .as_deref()
        .context("seed URL missing after validation")?;
    let seed = parse_seed_url(seed_url)?;

    let crawler = Crawler::from_config(&config).context("Failed to build HTTP client")?;
    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, cli.max_duration.map(Duration::from_secs));

    let report = crawler
        .crawl_from(&seed, &cancel)
        .await
        .with_context(|| format!("Crawl of {} failed", seed))?;

    print_report(&report);

    if cli.stats {
        println!();
        print_statistics(&CrawlStatistics::from_report(&report));
    }

    if let Some(path) = &config.output.summary_path {
        generate_markdown_summary(&report, Path::new(path))
            .with_context(|| format!("Failed to write summary to {}", path))?;
        tracing::info!("Summary written to {}", path);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitewalk=info,warn"),
            1 => EnvFilter::new("sitewalk=debug,info"),
            2 => EnvFilter::new("sitewalk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the effective configuration: defaults, then file, then flags
fn load_configuration(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let config = parse_config_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            let hash = compute_config_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    Ok(config)
}

/// Cancels the crawl on Ctrl-C or once the optional deadline passes
fn spawn_cancel_triggers(cancel: &CancellationToken, max_duration: Option<Duration>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            on_signal.cancel();
        }
    });

    if let Some(limit) = max_duration {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {
                    tracing::warn!("Crawl exceeded {:?}, stopping", limit);
                    on_deadline.cancel();
                }
                _ = on_deadline.cancelled() => {}
            }
        });
    }
}

/// Prints every page result, then every page error
fn print_report(report: &CrawlReport) {
    for result in &report.results {
        println!("{}", format_page_line(result));
    }

    for error in &report.errors {
        println!("{}", error);
    }

    if report.cancelled {
        tracing::warn!(
            "Crawl was cancelled; results are partial ({} queued pages not visited)",
            report.discarded_tasks
        );
    }
}
