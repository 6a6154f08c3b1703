//! Lead Prospector main entry point
//!
//! This is the command-line interface for the Lead Prospector discovery and
//! enrichment engine.

use clap::Parser;
use lead_prospector::config::{load_config_with_hash, Config};
use lead_prospector::discovery::{DiscoveryEngine, DiscoveryRequest, HttpDirectoryApi};
use lead_prospector::PipelineController;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lead Prospector: discover local businesses and enrich them into sales leads
///
/// Searches a business directory for a keyword and location, stores every new
/// listing, and enriches each website (content, structure, technologies,
/// performance) on a bounded pool of workers.
#[derive(Parser, Debug)]
#[command(name = "lead-prospector")]
#[command(version = "0.1.0")]
#[command(about = "Prospect discovery and enrichment engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Business category to search for, e.g. "dentist"
    #[arg(short, long, required_unless_present_any = ["stats", "drain", "dry_run"])]
    keyword: Option<String>,

    /// Place name, or raw "lat,lng" coordinates
    #[arg(short, long, required_unless_present_any = ["stats", "drain", "dry_run"])]
    location: Option<String>,

    /// Search radius in meters (only used with coordinates)
    #[arg(long)]
    radius: Option<u32>,

    /// Report the campaign as short when fewer candidates are found
    #[arg(long, default_value_t = 0)]
    min_results: usize,

    /// Maximum number of candidates to collect
    #[arg(long, default_value_t = 60)]
    max_results: usize,

    /// Region bias (ccTLD), e.g. "us"
    #[arg(long)]
    region: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what discovery would find without storing anything
    #[arg(long, conflicts_with_all = ["stats", "drain"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "drain"])]
    stats: bool,

    /// Process the existing job queue only
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    drain: bool,

    /// Enqueue discovered leads without processing the queue
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "drain"])]
    no_drain: bool,
}

impl Cli {
    fn discovery_request(&self) -> Option<DiscoveryRequest> {
        let keyword = self.keyword.as_deref()?;
        let location = self.location.as_deref().unwrap_or("");

        let mut request = DiscoveryRequest::new(keyword, location)
            .with_min_results(self.min_results)
            .with_max_results(self.max_results);
        if let Some(radius) = self.radius {
            request = request.with_radius(radius);
        }
        if let Some(region) = &self.region {
            request = request.with_region(region);
        }
        Some(request)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.stats {
        handle_stats(&config)?;
    } else if cli.dry_run {
        handle_dry_run(&config, cli.discovery_request()).await?;
    } else if cli.drain {
        handle_drain(&config).await?;
    } else if let Some(request) = cli.discovery_request() {
        handle_campaign(&config, request, !cli.no_drain).await?;
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
            0 => EnvFilter::new("lead_prospector=info,warn"),
            1 => EnvFilter::new("lead_prospector=debug,info"),
            2 => EnvFilter::new("lead_prospector=trace,debug"),
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

/// Handles the --dry-run mode: validates config and previews discovery
async fn handle_dry_run(
    config: &Config,
    request: Option<DiscoveryRequest>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Lead Prospector Dry Run ===\n");

    println!("Discovery:");
    println!("  Directory API: {}", config.discovery.base_url);
    println!(
        "  Page retry ladder: {} attempts, {}ms base delay",
        config.discovery.max_page_attempts, config.discovery.page_retry_delay_ms
    );
    println!("  Relevance rules: {}", config.relevance.len());

    println!("\nExtraction:");
    println!("  Fast tier timeout: {}s", config.extraction.fast_timeout_secs);
    println!("  Browser timeout: {}s", config.extraction.browser_timeout_secs);
    println!(
        "  Chromium: {}",
        config.extraction.chromium_path.as_deref().unwrap_or("auto-detect")
    );

    println!("\nQueue:");
    println!("  Workers: {}", config.queue.workers);
    println!("  Max attempts: {}", config.queue.max_attempts);
    println!("  Database: {}", config.storage.database_path);

    println!("\nProfiling:");
    println!("  Technology signatures: {}", config.profiling.technologies.len());
    println!(
        "  Indexing: {}",
        config.indexing.endpoint.as_deref().unwrap_or("log only")
    );

    println!("\n✓ Configuration is valid");

    let Some(request) = request else {
        return Ok(());
    };

    // Discovery only; the database is never opened
    let api = HttpDirectoryApi::new(&config.discovery)?;
    let engine = DiscoveryEngine::new(Arc::new(api), &config.discovery, config.relevance.clone());
    let output = engine.discover(request).await?;

    println!(
        "✓ Discovery would yield {} candidates ({})\n",
        output.candidates.len(),
        output.report.stop_reason
    );
    for candidate in &output.candidates {
        let sponsored = if candidate.sponsored { " [sponsored]" } else { "" };
        println!("  - {} ({}){}", candidate.name, candidate.place_id, sponsored);
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use lead_prospector::output::{load_statistics, print_statistics};
    use lead_prospector::storage::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.storage.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;

    // Load statistics
    let stats = load_statistics(&storage)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the --drain mode: processes queued jobs only
async fn handle_drain(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let controller = PipelineController::from_config(config)?;

    let result = controller.drain().await;
    controller.shutdown().await;

    match result {
        Ok(report) => {
            println!(
                "Queue drained: {} succeeded, {} retried, {} failed",
                report.succeeded, report.retried, report.failed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Drain failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the main campaign: discover, enqueue, and enrich
async fn handle_campaign(
    config: &Config,
    request: DiscoveryRequest,
    drain: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use lead_prospector::output::print_pipeline_report;

    let controller = PipelineController::from_config(config)?;

    let result = controller.run(request, drain).await;
    controller.shutdown().await;

    match result {
        Ok(report) => {
            tracing::info!("Campaign completed successfully");
            print_pipeline_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Campaign failed: {}", e);
            Err(e.into())
        }
    }
}
