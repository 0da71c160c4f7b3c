//! Per-site token-bucket rate limiter.
//!
//! Each site gets its own bucket sized by its configured requests-per-minute.
//! `acquire` blocks until a token is available, then sleeps a random jitter
//! between the site's min and max delay, scaled by a backoff multiplier that
//! the workflow raises after block signals and resets after success.

use crate::error::{Result, ScrapeError};
use pricescout_core::SiteId;
use pricescout_site::RateLimitConfig;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Ceiling for the backoff multiplier.
const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

/// One site's token bucket plus its jitter configuration.
struct Bucket {
    /// Maximum tokens; equals the site's requests-per-minute.
    capacity: f64,
    /// Tokens restored per second.
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
    min_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl Bucket {
    fn new(config: &RateLimitConfig) -> Self {
        let capacity = f64::from(config.requests_per_minute);
        Self {
            capacity,
            refill_rate: capacity / 60.0,
            tokens: capacity,
            last_refill: Instant::now(),
            min_delay: Duration::from_secs_f64(config.min_delay_seconds),
            max_delay: Duration::from_secs_f64(config.max_delay_seconds),
            backoff_multiplier: 1.0,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Random delay in [min, max] scaled by the current backoff multiplier.
    fn jitter(&self) -> Duration {
        let min = self.min_delay.as_secs_f64();
        let max = self.max_delay.as_secs_f64();
        let base = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(base * self.backoff_multiplier)
    }
}

/// Paces requests per site. Shared across concurrent runs.
pub struct RateLimiter {
    buckets: StdMutex<HashMap<SiteId, Arc<Mutex<Bucket>>>>,
}

impl RateLimiter {
    /// Create a limiter with no buckets; buckets are created lazily on
    /// first acquire for each site.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: StdMutex::new(HashMap::new()),
        }
    }

    fn bucket_for(&self, site: &SiteId, config: &RateLimitConfig) -> Arc<Mutex<Bucket>> {
        let mut buckets = self.buckets.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        buckets
            .entry(site.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Bucket::new(config))))
            .clone()
    }

    /// Wait until the site's bucket grants a token, then wait the jitter.
    ///
    /// The per-site async mutex is held across both waits, so concurrent
    /// callers for the same site are serialized roughly in arrival order.
    /// This never fails on its own; the only early exit is cancellation.
    pub async fn acquire(
        &self,
        site: &SiteId,
        config: &RateLimitConfig,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let bucket = self.bucket_for(site, config);

        let mut guard = tokio::select! {
            guard = bucket.lock() => guard,
            () = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        };

        guard.refill();
        if guard.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - guard.tokens) / guard.refill_rate);
            tracing::debug!(site = %site, wait_ms = wait.as_millis() as u64, "bucket empty, waiting for refill");
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            }
            guard.refill();
        }
        guard.tokens = (guard.tokens - 1.0).max(0.0);

        let jitter = guard.jitter();
        if !jitter.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(jitter) => {}
                () = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            }
        }

        Ok(())
    }

    /// Double the site's jitter multiplier, capped at 10x. Called after
    /// a 429/503-class signal.
    pub async fn trigger_backoff(&self, site: &SiteId) {
        if let Some(bucket) = self.existing(site) {
            let mut guard = bucket.lock().await;
            guard.backoff_multiplier =
                (guard.backoff_multiplier * 2.0).min(MAX_BACKOFF_MULTIPLIER);
            tracing::warn!(site = %site, multiplier = guard.backoff_multiplier, "raised backoff multiplier");
        }
    }

    /// Restore the site's jitter multiplier to 1x after a successful fetch.
    pub async fn reset_backoff(&self, site: &SiteId) {
        if let Some(bucket) = self.existing(site) {
            let mut guard = bucket.lock().await;
            if guard.backoff_multiplier > 1.0 {
                tracing::debug!(site = %site, "reset backoff multiplier");
            }
            guard.backoff_multiplier = 1.0;
        }
    }

    /// Current backoff multiplier for a site, 1.0 if the bucket does not
    /// exist yet.
    pub async fn backoff_multiplier(&self, site: &SiteId) -> f64 {
        match self.existing(site) {
            Some(bucket) => bucket.lock().await.backoff_multiplier,
            None => 1.0,
        }
    }

    fn existing(&self, site: &SiteId) -> Option<Arc<Mutex<Bucket>>> {
        let buckets = self.buckets.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        buckets.get(site).cloned()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_site() -> SiteId {
        SiteId::new("walmart").unwrap()
    }

    fn zero_jitter_config(rpm: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: rpm,
            min_delay_seconds: 0.0,
            max_delay_seconds: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_capacity_is_immediate() {
        let limiter = RateLimiter::new();
        let site = test_site();
        let config = zero_jitter_config(5);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire(&site, &config, &cancel).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_four_acquires_at_rpm_two_take_a_minute() {
        let limiter = RateLimiter::new();
        let site = test_site();
        let config = zero_jitter_config(2);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire(&site, &config, &cancel).await.unwrap();
        }
        // Two tokens start full; each extra token refills in 30s.
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_applied_after_token_grant() {
        let limiter = RateLimiter::new();
        let site = test_site();
        let config = RateLimitConfig {
            requests_per_minute: 60,
            min_delay_seconds: 2.0,
            max_delay_seconds: 2.0,
        };
        let cancel = CancellationToken::new();

        let start = Instant::now();
        limiter.acquire(&site, &config, &cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_and_caps() {
        let limiter = RateLimiter::new();
        let site = test_site();
        let config = zero_jitter_config(10);
        let cancel = CancellationToken::new();
        limiter.acquire(&site, &config, &cancel).await.unwrap();

        for _ in 0..6 {
            limiter.trigger_backoff(&site).await;
        }
        // 2^6 = 64 would exceed the cap.
        assert!((limiter.backoff_multiplier(&site).await - 10.0).abs() < f64::EPSILON);

        limiter.reset_backoff(&site).await;
        assert!((limiter.backoff_multiplier(&site).await - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_scales_jitter() {
        let limiter = RateLimiter::new();
        let site = test_site();
        let config = RateLimitConfig {
            requests_per_minute: 60,
            min_delay_seconds: 1.0,
            max_delay_seconds: 1.0,
        };
        let cancel = CancellationToken::new();

        limiter.acquire(&site, &config, &cancel).await.unwrap();
        limiter.trigger_backoff(&site).await;
        limiter.trigger_backoff(&site).await;

        let start = Instant::now();
        limiter.acquire(&site, &config, &cancel).await.unwrap();
        // 1s jitter at 4x multiplier.
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let limiter = Arc::new(RateLimiter::new());
        let site = test_site();
        let config = zero_jitter_config(1);
        let cancel = CancellationToken::new();

        // Drain the single token.
        limiter.acquire(&site, &config, &cancel).await.unwrap();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel_clone.cancel();
        });

        let result = limiter.acquire(&site, &config, &cancel).await;
        assert!(matches!(result, Err(ScrapeError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_sites_do_not_block_each_other() {
        let limiter = RateLimiter::new();
        let config = zero_jitter_config(1);
        let cancel = CancellationToken::new();

        let walmart = SiteId::new("walmart").unwrap();
        let target = SiteId::new("target").unwrap();

        let start = Instant::now();
        limiter.acquire(&walmart, &config, &cancel).await.unwrap();
        limiter.acquire(&target, &config, &cancel).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
