//! Newsday archiver main entry point
//!
//! This is the command-line interface for the Newsday archive crawler.

use chrono::{NaiveDate, Utc};
use clap::Parser;
use newsday_archiver::config::{load_config_with_hash, validate, Config, RendererKind};
use newsday_archiver::crawler::Coordinator;
use newsday_archiver::output::{
    generate_markdown_summary, print_statistics, write_outputs, CrawlStatistics,
};
use newsday_archiver::schedule::IndexUrlTemplate;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Interval between progress log lines during a crawl
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Newsday archiver: retrieves historical articles from newsday.co.tt
///
/// Visits one archive-index page per calendar day, going back a configurable
/// number of years, and extracts every linked article into JSON, JSON Lines,
/// CSV, Excel or SQLite exports.
#[derive(Parser, Debug)]
#[command(name = "newsday-archiver")]
#[command(version = "1.0.0")]
#[command(about = "Historical article archiver for newsday.co.tt", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of years to go back from the reference date
    #[arg(long, value_name = "N")]
    years_back: Option<u32>,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Delay in seconds between requests of one worker
    #[arg(long, value_name = "S")]
    delay: Option<f64>,

    /// Browsing context to use: http or chrome
    #[arg(long, value_name = "KIND", value_parser = parse_renderer)]
    renderer: Option<RendererKind>,

    /// Ask for a visible browser window
    #[arg(long)]
    headed: bool,

    /// Newest day to visit (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    reference_date: Option<NaiveDate>,

    /// Directory the export files are written to
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(years) = self.years_back {
            config.crawler.years_back = years;
        }
        if let Some(workers) = self.workers {
            config.crawler.worker_count = workers;
        }
        if let Some(delay) = self.delay {
            config.crawler.delay_seconds = delay;
        }
        if let Some(renderer) = self.renderer {
            config.crawler.renderer = renderer;
        }
        if self.headed {
            config.crawler.headless = false;
        }
        if let Some(date) = self.reference_date {
            config.crawler.reference_date = Some(date);
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
    }
}

fn parse_renderer(name: &str) -> Result<RendererKind, String> {
    RendererKind::parse(name)
        .ok_or_else(|| format!("unknown renderer '{}' (expected http or chrome)", name))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => load(path)?,
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };
    cli.apply_overrides(&mut config);

    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

fn load(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newsday_archiver=info,warn"),
            1 => EnvFilter::new("newsday_archiver=debug,info"),
            2 => EnvFilter::new("newsday_archiver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration and plan
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = Coordinator::with_browser(config.clone())?;
    let plan = coordinator.plan()?;
    let template = IndexUrlTemplate::new(&config.site.base_url, &config.site.index_path)?;

    println!("=== Newsday Archiver Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Years back: {}", config.crawler.years_back);
    println!("  Workers: {}", config.crawler.worker_count);
    println!("  Delay: {}s", config.crawler.delay_seconds);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Retry base delay: {}ms", config.crawler.retry_base_delay_ms);
    println!("  Order: {:?}", config.crawler.order);
    println!("  Renderer: {:?}", config.crawler.renderer);
    println!("  Headless: {}", config.crawler.headless);

    println!("\nSite:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Index path: {}", config.site.index_path);
    println!("  Article patterns: {}", config.site.article_patterns.len());
    println!("  Same host only: {}", config.site.same_host_only);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.value);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Prefix: {}", config.output.file_prefix);
    println!("  Formats: {}", config.output.formats.join(", "));
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nPlan:");
    println!("  Days: {} ({} to {})", plan.len(), plan.oldest(), plan.newest());
    println!("  Newest index: {}", template.build(plan.newest()));
    println!("  Oldest index: {}", template.build(plan.oldest()));

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let output = config.output.clone();
    let coordinator = Coordinator::with_browser(config)?;

    let cancel = coordinator.cancellation_token();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight fetches");
                cancel.cancel();
            }
        })
    };

    let progress = coordinator.progress();
    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshot = progress.snapshot();
            tracing::info!(
                "Progress: {}/{} days, {} articles, {} failures",
                snapshot.days_processed,
                snapshot.days_total,
                snapshot.articles_collected,
                snapshot.failures_so_far()
            );
        }
    });

    let result = coordinator.run().await;
    reporter.abort();
    interrupt.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let records = outcome.store.export();
    let written = write_outputs(&records, &output, Utc::now())?;

    if let Some(summary_path) = &output.summary_path {
        generate_markdown_summary(&outcome.report, &written, Path::new(summary_path))?;
        tracing::info!("Summary written to {}", summary_path);
    }

    print_statistics(&CrawlStatistics::collect(&records, &outcome.report));

    if outcome.report.cancelled {
        tracing::warn!("Crawl was interrupted; exports contain partial results");
    }

    Ok(())
}
