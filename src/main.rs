//! Estate-Crawler main entry point
//!
//! This is the command-line interface for the Estate-Crawler listing harvester.

use clap::Parser;
use estate_crawler::config::{load_config_with_hash, Config};
use estate_crawler::crawler::{Coordinator, DebugSink, FileDebugSink};
use estate_crawler::resolver::{ChromeResolver, DynamicResolver, NullResolver};
use estate_crawler::storage::open_storage;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Estate-Crawler: a real-estate listing harvester
///
/// Estate-Crawler walks the configured listing indexes, parses every listing
/// it finds and stores the results in SQLite (and optionally as JSON).
#[derive(Parser, Debug)]
#[command(name = "estate-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A real-estate listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Crawl without launching a browser; phone numbers and looked-up
    /// coordinates stay empty
    #[arg(long)]
    no_browser: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash, cli.no_browser).await?;
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
            0 => EnvFilter::new("estate_crawler=info,warn"),
            1 => EnvFilter::new("estate_crawler=debug,info"),
            2 => EnvFilter::new("estate_crawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Estate-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!(
        "  Backoff: {}ms doubling, capped at {}ms",
        config.crawler.backoff_base_ms, config.crawler.backoff_max_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Removed marker: /{}/", config.crawler.removed_marker);

    println!("\nHeaders ({}):", config.headers.len());
    for name in config.headers.keys() {
        println!("  - {}", name);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(json_path) = &config.output.json_path {
        println!("  JSON export: {}", json_path);
    }
    println!("  Debug markers: {}", config.output.debug_dir);

    println!(
        "\nBrowser: {}",
        if config.browser.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    println!("\nIndexes ({}):", config.indexes.len());
    for index in &config.indexes {
        println!("  - {} [{}] {}", index.property_type, index.kind, index.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use estate_crawler::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Builds the progress bar shared by pagination and parsing
fn progress_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: String,
    no_browser: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Indexes to crawl: {}", config.indexes.len());

    let resolver: Arc<dyn DynamicResolver> = if no_browser || !config.browser.enabled {
        tracing::info!("Browser disabled, phone numbers and looked-up coordinates stay empty");
        Arc::new(NullResolver)
    } else {
        Arc::new(ChromeResolver::launch(&config.browser)?)
    };
    let debug_sink: Arc<dyn DebugSink> = Arc::new(FileDebugSink::new(&config.output.debug_dir));
    let storage = open_storage(Path::new(&config.output.database_path))?;

    let mut coordinator = Coordinator::new(config, config_hash, resolver, debug_sink, storage)?;
    coordinator.set_progress(progress_bar()?);

    // Ctrl-C stops admitting new requests; work in flight drains
    let gate = coordinator.gate().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            gate.close();
        }
    });

    match coordinator.run().await {
        Ok(report) => {
            tracing::info!(
                "Run {}: {} indexes, {} listings found, {} parsed, {} gone, {} failed, {} failed fields, peak {} in flight",
                report.run_id,
                report.indexes,
                report.stubs,
                report.parsed,
                report.removed,
                report.failed,
                report.failed_steps,
                report.peak_in_flight
            );
            if report.interrupted {
                tracing::warn!("Run {} was interrupted; rerun to cover the remaining indexes", report.run_id);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
