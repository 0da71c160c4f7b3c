//! Scraping orchestration engine.
//!
//! This crate coordinates everything that happens between "scrape this
//! product query at this zipcode" and a list of normalized product records:
//!
//! - [`RateLimiter`] paces per-site requests with a token bucket, random
//!   jitter, and a backoff multiplier that grows after block signals.
//! - [`SessionStore`] caches location cookies on disk per (site, zipcode)
//!   with TTL expiry, so repeat runs skip the location UI entirely.
//! - [`resolver`] resolves multi-candidate selector specs against a page,
//!   trying fallbacks in order until one matches.
//! - [`ScrapeWorkflow`] drives the run as a state machine: set location,
//!   search, extract each product, normalize, emit records.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod limiter;
pub mod normalize;
pub mod record;
pub mod resolver;
pub mod session;
pub mod workflow;

pub use error::{Result, ScrapeError};
pub use limiter::RateLimiter;
pub use record::{ProductRecord, RunStatus, ScrapeReport};
pub use resolver::ExtractedField;
pub use session::{SessionRecord, SessionStore};
pub use workflow::{ScrapeWorkflow, WorkflowParams};
