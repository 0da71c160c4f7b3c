//! Site definition types and structures.
//!
//! This module defines the data structures for site definitions loaded from
//! TOML files. A definition declares everything the scraping workflow needs
//! to drive one retailer: base URL, location-setting method and its
//! selectors, search endpoint, product field selectors, and rate limits.

use crate::error::{Result, SiteError};
use pricescout_core::SiteId;
use serde::{Deserialize, Serialize};

/// Complete site definition loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDefinition {
    /// Core site metadata
    pub site: SiteMetadata,

    /// Rate limiting parameters
    pub rate_limit: RateLimitConfig,

    /// Location-setting configuration
    pub location: LocationMethod,

    /// Search configuration
    pub search: SearchConfig,

    /// Product page selectors
    pub product: ProductSelectors,
}

impl SiteDefinition {
    /// Get the site ID.
    #[must_use]
    pub fn id(&self) -> &SiteId {
        &self.site.id
    }

    /// Get the site name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.site.name
    }

    /// Validate the site definition for completeness and correctness.
    ///
    /// This runs at load time, before any network activity, so a missing
    /// required selector list fails the run up front rather than mid-scrape.
    pub fn validate(&self) -> Result<()> {
        if self.site.name.is_empty() {
            return Err(SiteError::ValidationError {
                site_id: self.site.id.to_string(),
                reason: "site name cannot be empty".to_string(),
            });
        }

        if self.site.base_url.is_empty() {
            return Err(SiteError::ValidationError {
                site_id: self.site.id.to_string(),
                reason: "site base_url cannot be empty".to_string(),
            });
        }

        self.rate_limit.validate(&self.site.id)?;
        self.location.validate(&self.site.id)?;
        self.search.validate(&self.site.id)?;
        self.product.validate(&self.site.id)?;

        Ok(())
    }
}

/// Core site metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMetadata {
    /// Unique site identifier (e.g., "walmart", "best-buy")
    pub id: SiteId,

    /// Human-readable site name
    pub name: String,

    /// Site base URL, used for the location flow and link absolutization
    pub base_url: String,

    /// Whether the site requires JavaScript rendering
    #[serde(default = "default_true")]
    pub requires_js: bool,
}

fn default_true() -> bool {
    true
}

/// Rate limiting parameters for one site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per minute (also the token-bucket capacity)
    pub requests_per_minute: u32,

    /// Minimum human-like delay after each request, in seconds
    pub min_delay_seconds: f64,

    /// Maximum human-like delay after each request, in seconds
    pub max_delay_seconds: f64,
}

impl RateLimitConfig {
    fn validate(&self, site_id: &SiteId) -> Result<()> {
        if self.requests_per_minute == 0 || self.requests_per_minute > 600 {
            return Err(SiteError::ValidationError {
                site_id: site_id.to_string(),
                reason: format!(
                    "requests_per_minute must be 1-600, got {}",
                    self.requests_per_minute
                ),
            });
        }

        if self.min_delay_seconds < 0.0 || self.max_delay_seconds < self.min_delay_seconds {
            return Err(SiteError::ValidationError {
                site_id: site_id.to_string(),
                reason: format!(
                    "delay range must satisfy 0 <= min <= max, got {}-{}",
                    self.min_delay_seconds, self.max_delay_seconds
                ),
            });
        }

        Ok(())
    }
}

/// An ordered list of candidate locators for one logical field.
///
/// Order encodes preference: earlier entries are tried first (most
/// specific/most stable), later ones are fallbacks. In TOML a spec is
/// written either as a plain array of selector strings or as a table with
/// `candidates` and an optional `attr` to extract instead of text:
///
/// ```toml
/// name = ["h1[itemprop='name']", "h1.prod-title"]
/// product_link = { candidates = ["a[link-identifier]"], attr = "href" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SelectorSpecRepr")]
pub struct SelectorSpec {
    /// Candidate locators, in preference order
    pub candidates: Vec<String>,

    /// Attribute to extract instead of text content (e.g. "href")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

impl SelectorSpec {
    /// Create a spec from a list of candidate locators.
    #[must_use]
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            attr: None,
        }
    }

    /// Create a spec that extracts an attribute instead of text.
    #[must_use]
    pub fn with_attr(candidates: Vec<String>, attr: impl Into<String>) -> Self {
        Self {
            candidates,
            attr: Some(attr.into()),
        }
    }

    /// Whether the spec has no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectorSpecRepr {
    List(Vec<String>),
    Detailed {
        candidates: Vec<String>,
        #[serde(default)]
        attr: Option<String>,
    },
}

impl From<SelectorSpecRepr> for SelectorSpec {
    fn from(repr: SelectorSpecRepr) -> Self {
        match repr {
            SelectorSpecRepr::List(candidates) => Self {
                candidates,
                attr: None,
            },
            SelectorSpecRepr::Detailed { candidates, attr } => Self { candidates, attr },
        }
    }
}

/// Methods for setting the delivery location on a site.
///
/// Per-site behavior is dispatched on this enum rather than through
/// inheritance: the definition file declares the method and the workflow
/// interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum LocationMethod {
    /// Cookie-backed location modal: click a location button, fill the
    /// zipcode input, submit, then persist the resulting cookies.
    CookieModal {
        /// Selectors for the modal interaction steps
        selectors: LocationSelectors,
    },

    /// The site serves location-independent data; no setup needed.
    None,
}

impl LocationMethod {
    fn validate(&self, site_id: &SiteId) -> Result<()> {
        match self {
            Self::CookieModal { selectors } => selectors.validate(site_id),
            Self::None => Ok(()),
        }
    }
}

/// Selectors for the location-modal interaction steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSelectors {
    /// Candidates for the button that opens the location modal
    pub location_button: SelectorSpec,

    /// Candidates for the zipcode text input
    pub zipcode_input: SelectorSpec,

    /// Candidates for the modal submit button
    pub submit_button: SelectorSpec,
}

impl LocationSelectors {
    fn validate(&self, site_id: &SiteId) -> Result<()> {
        for (field, spec) in [
            ("location_button", &self.location_button),
            ("zipcode_input", &self.zipcode_input),
            ("submit_button", &self.submit_button),
        ] {
            if spec.is_empty() {
                return Err(SiteError::ValidationError {
                    site_id: site_id.to_string(),
                    reason: format!("location selector '{field}' has no candidates"),
                });
            }
        }
        Ok(())
    }
}

/// Search endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// URL template with a `{query}` placeholder
    pub url_template: String,

    /// Candidates for product links on the results page; usually an
    /// attribute spec extracting `href`
    pub product_link: SelectorSpec,
}

impl SearchConfig {
    fn validate(&self, site_id: &SiteId) -> Result<()> {
        if !self.url_template.contains("{query}") {
            return Err(SiteError::ValidationError {
                site_id: site_id.to_string(),
                reason: format!(
                    "search url_template must contain a {{query}} placeholder, got '{}'",
                    self.url_template
                ),
            });
        }

        if self.product_link.is_empty() {
            return Err(SiteError::ValidationError {
                site_id: site_id.to_string(),
                reason: "search selector 'product_link' has no candidates".to_string(),
            });
        }

        Ok(())
    }
}

/// Selector specs for product page fields.
///
/// `name` and `current_price` are required; every other field is optional
/// and its absence in the definition simply means the field is never
/// extracted for this site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSelectors {
    /// Product title
    pub name: SelectorSpec,

    /// Current (possibly discounted) price
    pub current_price: SelectorSpec,

    /// Pre-discount price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<SelectorSpec>,

    /// Stock status text ("In stock", "Only 3 left", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_status: Option<SelectorSpec>,

    /// Average rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_avg: Option<SelectorSpec>,

    /// Rating/review count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<SelectorSpec>,

    /// Free-shipping indicator text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_shipping: Option<SelectorSpec>,

    /// Delivery estimate text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_estimate: Option<SelectorSpec>,

    /// Brand name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<SelectorSpec>,

    /// Specifications table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs_table: Option<SelectorSpec>,
}

impl ProductSelectors {
    fn validate(&self, site_id: &SiteId) -> Result<()> {
        if self.name.is_empty() {
            return Err(SiteError::ValidationError {
                site_id: site_id.to_string(),
                reason: "product selector 'name' has no candidates".to_string(),
            });
        }

        if self.current_price.is_empty() {
            return Err(SiteError::ValidationError {
                site_id: site_id.to_string(),
                reason: "product selector 'current_price' has no candidates".to_string(),
            });
        }

        Ok(())
    }
}
