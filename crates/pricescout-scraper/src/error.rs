//! Error types for the scraping engine.

use pricescout_core::{SiteId, Zipcode};
use thiserror::Error;

/// Errors that can abort a scrape run.
///
/// Selector misses are deliberately absent here. A field whose candidates
/// all fail to match is a normal outcome, surfaced as `None` plus a
/// diagnostic entry on the record, never as an error.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The location-setting UI sequence could not be completed.
    #[error("failed to set location for {site} at {zipcode}: {reason}")]
    LocationSetupFailure {
        /// Site the run targeted
        site: SiteId,
        /// Zipcode that could not be applied
        zipcode: Zipcode,
        /// Which step failed and why
        reason: String,
    },

    /// Anti-bot or rate-limit interstitial persisted through all retries.
    #[error("transient block persisted after {attempts} attempts: {context}")]
    BlockPersisted {
        /// Number of attempts made
        attempts: u32,
        /// What was being fetched
        context: String,
    },

    /// The run was cancelled via its cancellation token.
    #[error("scrape run cancelled")]
    Cancelled,

    /// Site definition errors (invalid or missing configuration).
    #[error("site configuration error: {0}")]
    Configuration(#[from] pricescout_site::SiteError),

    /// Browser-level failures that are not transient blocks.
    #[error("browser error: {0}")]
    Browser(#[from] pricescout_browser::BrowserError),

    /// Core validation failures (bad site id, bad zipcode).
    #[error(transparent)]
    Core(#[from] pricescout_core::CoreError),

    /// Session cache I/O failures on write paths.
    ///
    /// Read-path corruption never produces this; the store treats it as
    /// a cache miss.
    #[error("session store error: {0}")]
    SessionStore(String),
}

/// Result alias for scraping operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;
