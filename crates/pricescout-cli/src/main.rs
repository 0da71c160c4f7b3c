//! PriceScout command-line entry point.
//!
//! Wires the site registry, rate limiter, session cache, and browser into
//! one scrape run and writes the report as JSON or CSV.

mod export;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use pricescout_browser::{BrowserSession, FingerprintConfig};
use pricescout_core::{AppConfig, SiteId, Zipcode};
use pricescout_scraper::{RateLimiter, RunStatus, ScrapeWorkflow, SessionStore, WorkflowParams};
use pricescout_site::{SiteLoader, SiteRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Scrape location-specific product data from retail sites.
#[derive(Parser, Debug)]
#[command(name = "pricescout", version, about)]
struct Cli {
    /// Site to scrape; must match a definition in the site-definitions
    /// directory (e.g. "walmart")
    #[arg(long)]
    site: String,

    /// Five-digit delivery zipcode to set before searching
    #[arg(long)]
    zipcode: String,

    /// Product search query
    #[arg(long)]
    query: String,

    /// Maximum number of product pages to scrape
    #[arg(long, default_value_t = 5)]
    max_results: usize,

    /// Output file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Show the browser window (overrides the headless config)
    #[arg(long)]
    headful: bool,

    /// Directory of site definition TOML files; defaults to the
    /// workspace's site-definitions directory
    #[arg(long)]
    definitions_dir: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let site = SiteId::new(cli.site.as_str()).context("invalid site id")?;
    let zipcode = Zipcode::new(cli.zipcode.as_str()).context("invalid zipcode")?;
    let config = AppConfig::load_with_env().context("loading configuration")?;

    let loader = match &cli.definitions_dir {
        Some(dir) => SiteLoader::new(dir)?,
        None => SiteLoader::with_default_dir()?,
    };
    let registry = SiteRegistry::load_from(&loader)?;
    tracing::debug!(sites = registry.count(), "site registry loaded");
    let definition = registry.get(&site)?;

    let ttl_hours = i64::try_from(config.scraping.session_ttl_hours).unwrap_or(i64::MAX);
    let cache_dir = AppConfig::cache_dir().context("resolving cache directory")?;
    let sessions = Arc::new(SessionStore::new(cache_dir.join("sessions"), ttl_hours)?);
    let removed = sessions.cleanup_expired();
    if removed > 0 {
        tracing::debug!(removed, "swept expired sessions");
    }

    let headless = config.browser.headless && !cli.headful;
    let browser = BrowserSession::launch_with_fingerprint(
        headless,
        FingerprintConfig::for_site(site.as_str()),
    )
    .await
    .context("launching browser")?
    .with_navigation_timeout(Duration::from_millis(config.browser.navigation_timeout_ms));

    let page = browser.open_page().await.context("opening page")?;

    let workflow = ScrapeWorkflow::new(definition, Arc::new(RateLimiter::new()), sessions)
        .with_max_retries(config.scraping.max_retries);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing current step");
            signal_cancel.cancel();
        }
    });

    let params = WorkflowParams {
        zipcode,
        query: cli.query.clone(),
        max_results: cli.max_results,
    };
    let report = workflow.run(&page, &params, &cancel).await;

    if let Err(e) = browser.shutdown().await {
        tracing::warn!(error = %e, "browser shutdown failed");
    }

    match &cli.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            match cli.format {
                OutputFormat::Json => export::write_json(&report, file)?,
                OutputFormat::Csv => export::write_csv(&report, file)?,
            }
            tracing::info!(path = %path.display(), products = report.products.len(), "report written");
        }
        None => {
            let stdout = std::io::stdout().lock();
            match cli.format {
                OutputFormat::Json => export::write_json(&report, stdout)?,
                OutputFormat::Csv => export::write_csv(&report, stdout)?,
            }
        }
    }

    match &report.status {
        RunStatus::Done => Ok(()),
        RunStatus::Aborted(reason) => anyhow::bail!("run aborted: {reason}"),
    }
}
