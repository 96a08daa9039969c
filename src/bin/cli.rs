//! Career Crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::time::Duration;

use career_crawler::{
    adapters::AdapterRegistry,
    error::{AppError, Result},
    models::Config,
    pipeline::{self, CrawlContext},
    services::AtsDetector,
    storage::DedupStore,
    utils::{http::HttpClient, log as console},
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Career Crawler - job posting discovery
#[derive(Parser, Debug)]
#[command(
    name = "career-crawler",
    version,
    about = "Discovers new job postings on company career pages"
)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress console summaries
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl every configured company
    Run {
        /// Classify jobs without recording them in the dedup store
        #[arg(long)]
        dry_run: bool,
    },

    /// Detect the ATS behind a career URL
    Detect {
        url: String,

        /// Company name, enables slug probing against hosted boards
        #[arg(long)]
        name: Option<String>,
    },

    /// Show dedup store totals
    Stats,

    /// List jobs first seen on or after a date
    Recent {
        /// Date as YYYY-MM-DD
        #[arg(long)]
        since: NaiveDate,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    console::set_quiet(cli.quiet);

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        log::warn!("{} not found, using defaults", cli.config.display());
        Config::default()
    };

    match cli.command {
        Command::Run { dry_run } => {
            config.validate()?;
            if config.companies.is_empty() {
                return Err(AppError::config("no [[companies]] configured"));
            }

            let mut ctx = CrawlContext::from_config(config)?;
            if dry_run {
                log::info!("Dry run: sightings will not be recorded");
                ctx = ctx.dry_run();
            }

            let run = pipeline::run_crawler(&ctx).await?;
            for job in run.ranked.iter().take(20) {
                let score = job.score.map(|s| format!("{s:>3} ")).unwrap_or_default();
                console::sub_item(&format!(
                    "{}[{}] {} - {} ({})",
                    score,
                    job.status.as_str(),
                    job.job.company,
                    job.job.title,
                    job.job.canonical_url
                ));
            }
        }

        Command::Detect { url, name } => {
            let http = HttpClient::new(&config.crawler)?;
            let detector = AtsDetector::new(http.clone());

            let detection = match name {
                Some(name) => {
                    let adapters = AdapterRegistry::with_defaults(&http, config.crawler.max_pages);
                    let budget = Duration::from_secs(config.crawler.company_budget_secs);
                    detector.detect_for_company(&name, &url, &adapters, budget).await
                }
                None => detector.detect(&url).await,
            };

            console::summary(
                "Detection",
                &[
                    ("ATS", detection.ats_type.to_string()),
                    ("Method", format!("{:?}", detection.method)),
                    ("Fetch URL", detection.fetch_url(&url).to_string()),
                ],
            );
        }

        Command::Stats => {
            let store = DedupStore::open(&config.store.path, config.store.hash_policy)?;
            let stats = store.stats()?;

            console::header(&format!("Dedup store: {}", store.path().display()));
            console::sub_item(&format!("Total postings: {}", stats.total));
            console::separator();
            for (company, count) in &stats.by_company {
                console::sub_item(&format!("{company}: {count}"));
            }
            console::separator();
            for (day, count) in stats.daily_new.iter().rev().take(14) {
                console::sub_item(&format!("{day}: {count} new"));
            }
        }

        Command::Recent { since } => {
            let store = DedupStore::open(&config.store.path, config.store.hash_policy)?;
            let jobs = store.recent(since)?;

            console::header(&format!("{} jobs first seen since {}", jobs.len(), since));
            for job in &jobs {
                let location = if job.location.is_empty() { "-" } else { job.location.as_str() };
                console::sub_item(&format!(
                    "{} | {} | {} | {}",
                    job.discovered_at.format("%Y-%m-%d"),
                    job.company,
                    job.title,
                    location
                ));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} companies)", config.companies.len());
        }
    }

    Ok(())
}
