//! The per-run scrape workflow state machine.
//!
//! A run moves through location setup, search, and per-product extraction.
//! Session cache hits skip the location UI entirely; transient blocks are
//! retried with exponential backoff while raising the limiter's jitter
//! multiplier; cancellation is observed at every suspension point. A failed
//! product candidate is logged and skipped, never fatal; partial results
//! survive an abort.

use crate::error::{Result, ScrapeError};
use crate::limiter::RateLimiter;
use crate::normalize;
use crate::record::{ProductRecord, RunStatus, ScrapeReport};
use crate::resolver;
use crate::session::SessionStore;
use pricescout_browser::{absolutize, BrowserError, PageActions};
use pricescout_core::{Timestamp, Zipcode};
use pricescout_site::{LocationMethod, SelectorSpec, SiteDefinition};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of attempts for retryable steps.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay in milliseconds for retry backoff; scaled by attempt number.
const RETRY_DELAY_MS: u64 = 2000;

/// Settle delay after submitting the location modal, letting the site
/// apply the zipcode before cookies are exported.
const MODAL_SETTLE_MS: u64 = 1000;

/// Parameters for one scrape run.
#[derive(Debug, Clone)]
pub struct WorkflowParams {
    /// Zipcode to set before searching.
    pub zipcode: Zipcode,
    /// Search query.
    pub query: String,
    /// Maximum number of product pages to visit.
    pub max_results: usize,
}

/// Drives scrape runs against one site definition.
pub struct ScrapeWorkflow {
    definition: SiteDefinition,
    limiter: Arc<RateLimiter>,
    sessions: Arc<SessionStore>,
    max_retries: u32,
}

impl ScrapeWorkflow {
    /// Create a workflow for a validated site definition.
    #[must_use]
    pub fn new(
        definition: SiteDefinition,
        limiter: Arc<RateLimiter>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            definition,
            limiter,
            sessions,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the retry ceiling for navigations and UI interactions.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Execute a full run on an already-open page.
    ///
    /// Always returns a report; errors become `Aborted` status with any
    /// records extracted so far retained.
    pub async fn run(
        &self,
        page: &dyn PageActions,
        params: &WorkflowParams,
        cancel: &CancellationToken,
    ) -> ScrapeReport {
        let started_at = Timestamp::now();
        let mut products = Vec::new();

        tracing::info!(
            site = %self.definition.id(),
            zipcode = %params.zipcode,
            query = %params.query,
            "starting scrape run"
        );

        let status = match self.drive(page, params, cancel, &mut products).await {
            Ok(()) => RunStatus::Done,
            Err(e) => {
                tracing::error!(site = %self.definition.id(), error = %e, "run aborted");
                RunStatus::Aborted(e.to_string())
            }
        };

        tracing::info!(
            site = %self.definition.id(),
            products = products.len(),
            status = ?status,
            "scrape run finished"
        );

        ScrapeReport {
            site: self.definition.id().clone(),
            zipcode: params.zipcode.clone(),
            query: params.query.clone(),
            products,
            status,
            started_at,
            completed_at: Timestamp::now(),
        }
    }

    async fn drive(
        &self,
        page: &dyn PageActions,
        params: &WorkflowParams,
        cancel: &CancellationToken,
        products: &mut Vec<ProductRecord>,
    ) -> Result<()> {
        self.establish_location(page, params, cancel).await?;

        let links = self.search(page, params, cancel).await?;
        if links.is_empty() {
            tracing::info!(query = %params.query, "search returned no product links");
            return Ok(());
        }

        for url in links {
            if cancel.is_cancelled() {
                return Err(ScrapeError::Cancelled);
            }
            match self.extract_product(page, &url, params, cancel).await {
                Ok(record) => products.push(record),
                Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "skipping product candidate");
                }
            }
        }

        Ok(())
    }

    /// Init -> LocationReady.
    ///
    /// A valid cached session imports cookies and skips the UI sequence.
    /// Otherwise the location modal is driven and the resulting cookies
    /// are stored for next time.
    async fn establish_location(
        &self,
        page: &dyn PageActions,
        params: &WorkflowParams,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let LocationMethod::CookieModal { selectors } = &self.definition.location else {
            return Ok(());
        };

        let site = self.definition.id();
        if let Some(record) = self.sessions.get(site, &params.zipcode) {
            match self
                .guarded(page.import_cookies(&record.cookie_blob), cancel)
                .await?
            {
                Ok(()) => {
                    tracing::info!(site = %site, zipcode = %params.zipcode, "reusing cached session");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(site = %site, error = %e, "cookie import failed, rebuilding session");
                    self.sessions.invalidate(site, &params.zipcode);
                }
            }
        }

        let setup_failure = |reason: String| ScrapeError::LocationSetupFailure {
            site: site.clone(),
            zipcode: params.zipcode.clone(),
            reason,
        };

        self.fetch_with_retry(page, &self.definition.site.base_url, cancel)
            .await
            .map_err(|e| match e {
                ScrapeError::BlockPersisted { attempts, .. } => {
                    setup_failure(format!("blocked after {attempts} attempts"))
                }
                other => other,
            })?;

        if !self
            .click_with_retry(page, &selectors.location_button, cancel)
            .await?
        {
            return Err(setup_failure("location button not found".to_string()));
        }

        if !self
            .fill_with_retry(page, &selectors.zipcode_input, params.zipcode.as_str(), cancel)
            .await?
        {
            return Err(setup_failure("zipcode input not found".to_string()));
        }

        if !self
            .click_with_retry(page, &selectors.submit_button, cancel)
            .await?
        {
            return Err(setup_failure("submit button not found".to_string()));
        }

        self.wait(Duration::from_millis(MODAL_SETTLE_MS), cancel)
            .await?;

        let blob = self.guarded(page.export_cookies(), cancel).await??;
        self.sessions.put(site, &params.zipcode, blob)?;
        tracing::info!(site = %site, zipcode = %params.zipcode, "location set and session stored");

        Ok(())
    }

    /// LocationReady -> Searching. Returns deduplicated absolute product
    /// URLs capped at `max_results`. Empty is a valid outcome.
    async fn search(
        &self,
        page: &dyn PageActions,
        params: &WorkflowParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let encoded: String = url::form_urlencoded::byte_serialize(params.query.as_bytes()).collect();
        let search_url = self
            .definition
            .search
            .url_template
            .replace("{query}", &encoded);

        self.fetch_with_retry(page, &search_url, cancel).await?;

        let raw_links = resolver::resolve_all(
            page,
            &self.definition.search.product_link,
            params.max_results.saturating_mul(4),
        )
        .await?;

        let mut seen = HashSet::new();
        let links: Vec<String> = raw_links
            .into_iter()
            .filter_map(|link| absolutize(&self.definition.site.base_url, &link).ok())
            .filter(|link| seen.insert(link.clone()))
            .take(params.max_results)
            .collect();

        tracing::info!(query = %params.query, candidates = links.len(), "search complete");
        Ok(links)
    }

    /// Extracting: one product page to one record. Missing fields become
    /// diagnostics, never errors.
    async fn extract_product(
        &self,
        page: &dyn PageActions,
        url: &str,
        params: &WorkflowParams,
        cancel: &CancellationToken,
    ) -> Result<ProductRecord> {
        self.fetch_with_retry(page, url, cancel).await?;

        let mut record = ProductRecord::empty(
            url.to_string(),
            self.definition.id().clone(),
            params.zipcode.clone(),
        );
        let product = &self.definition.product;

        match resolver::resolve(page, &product.name).await? {
            Some(field) => record.name = Some(field.value),
            None => record.diagnostics.push("name".to_string()),
        }

        match resolver::resolve(page, &product.current_price).await? {
            Some(field) => record.current_price = normalize::normalize_price(&field.value),
            None => record.diagnostics.push("current_price".to_string()),
        }

        if let Some(spec) = &product.original_price {
            match resolver::resolve(page, spec).await? {
                Some(field) => record.original_price = normalize::normalize_price(&field.value),
                None => record.diagnostics.push("original_price".to_string()),
            }
        }

        if let (Some(original), Some(current)) = (record.original_price, record.current_price) {
            record.discount_percent = normalize::compute_discount(original, current);
        }

        if let Some(spec) = &product.stock_status {
            match resolver::resolve(page, spec).await? {
                Some(field) => {
                    let (in_stock, quantity) = normalize::parse_availability(&field.value);
                    record.in_stock = Some(in_stock);
                    record.quantity_available = quantity;
                    record.stock_status_text = Some(field.value);
                }
                None => record.diagnostics.push("stock_status".to_string()),
            }
        }

        if let Some(spec) = &product.rating_avg {
            match resolver::resolve(page, spec).await? {
                Some(field) => record.rating_avg = normalize::normalize_rating(&field.value),
                None => record.diagnostics.push("rating_avg".to_string()),
            }
        }

        if let Some(spec) = &product.rating_count {
            match resolver::resolve(page, spec).await? {
                Some(field) => record.rating_count = normalize::parse_count(&field.value),
                None => record.diagnostics.push("rating_count".to_string()),
            }
        }

        if let Some(spec) = &product.free_shipping {
            match resolver::resolve(page, spec).await? {
                Some(field) => {
                    record.free_shipping = Some(field.value.to_lowercase().contains("free"));
                }
                None => record.diagnostics.push("free_shipping".to_string()),
            }
        }

        if let Some(spec) = &product.delivery_estimate {
            match resolver::resolve(page, spec).await? {
                Some(field) => record.delivery_estimate = Some(field.value),
                None => record.diagnostics.push("delivery_estimate".to_string()),
            }
        }

        if let Some(spec) = &product.brand {
            match resolver::resolve(page, spec).await? {
                Some(field) => record.brand = Some(field.value),
                None => record.diagnostics.push("brand".to_string()),
            }
        }

        if let Some(spec) = &product.specs_table {
            let rows = resolver::resolve_table(page, spec).await?;
            if rows.is_empty() {
                record.diagnostics.push("specs_table".to_string());
            } else {
                record.specs = rows.into_iter().collect();
            }
        }

        if !record.diagnostics.is_empty() {
            tracing::debug!(
                url = %url,
                missing = ?record.diagnostics,
                "some fields missed all selector candidates"
            );
        }

        Ok(record)
    }

    /// Acquire a permit and navigate, retrying transient blocks with
    /// exponential backoff. Each block raises the limiter's jitter
    /// multiplier; a successful navigation resets it.
    async fn fetch_with_retry(
        &self,
        page: &dyn PageActions,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let site = self.definition.id();

        for attempt in 1..=self.max_retries {
            self.limiter
                .acquire(site, &self.definition.rate_limit, cancel)
                .await?;

            match self.guarded(page.navigate(url), cancel).await? {
                Ok(()) => {
                    self.limiter.reset_backoff(site).await;
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        url = %url,
                        attempt,
                        max = self.max_retries,
                        error = %e,
                        "transient block, backing off"
                    );
                    self.limiter.trigger_backoff(site).await;

                    if attempt < self.max_retries {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        self.wait(delay, cancel).await?;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ScrapeError::BlockPersisted {
            attempts: self.max_retries,
            context: url.to_string(),
        })
    }

    /// Try to click any candidate; retry the whole spec up to the attempt
    /// ceiling. `Ok(false)` means every candidate stayed missing.
    async fn click_with_retry(
        &self,
        page: &dyn PageActions,
        spec: &SelectorSpec,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        for attempt in 1..=self.max_retries {
            for candidate in &spec.candidates {
                match self.guarded(page.click(candidate), cancel).await? {
                    Ok(()) => return Ok(true),
                    Err(BrowserError::SelectorNotFound(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            if attempt < self.max_retries {
                let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                self.wait(delay, cancel).await?;
            }
        }
        Ok(false)
    }

    /// Same retry shape as `click_with_retry`, for text inputs.
    async fn fill_with_retry(
        &self,
        page: &dyn PageActions,
        spec: &SelectorSpec,
        value: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        for attempt in 1..=self.max_retries {
            for candidate in &spec.candidates {
                match self.guarded(page.fill(candidate, value), cancel).await? {
                    Ok(()) => return Ok(true),
                    Err(BrowserError::SelectorNotFound(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            if attempt < self.max_retries {
                let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                self.wait(delay, cancel).await?;
            }
        }
        Ok(false)
    }

    /// Race a page operation against the cancellation token, so a stalled
    /// render cannot hold the run past a cancel request.
    async fn guarded<T>(
        &self,
        op: impl std::future::Future<Output = T>,
        cancel: &CancellationToken,
    ) -> Result<T> {
        tokio::select! {
            out = op => Ok(out),
            () = cancel.cancelled() => Err(ScrapeError::Cancelled),
        }
    }

    /// Cancellation-aware sleep.
    async fn wait(&self, delay: Duration, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = cancel.cancelled() => Err(ScrapeError::Cancelled),
        }
    }
}
