//! PriceScout Site - Site definition system for retail scraping.
//!
//! This crate provides the types and functionality for managing per-site
//! scraping definitions. It handles loading TOML definition files, caching
//! them in memory, and providing lookup by site identifier.
//!
//! # Architecture
//!
//! - **Definition Types** ([`definition`]): Strongly-typed site metadata and selector specs
//! - **Loader** ([`loader`]): TOML file loading from the `site-definitions/` directory
//! - **Registry** ([`registry`]): In-memory cache keyed by site ID
//! - **Errors** ([`error`]): Site-specific error types
//!
//! # Example
//!
//! ```rust,no_run
//! use pricescout_site::{SiteLoader, SiteRegistry};
//! use pricescout_core::SiteId;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = SiteLoader::with_default_dir()?;
//! let registry = SiteRegistry::load_from(&loader)?;
//!
//! let site_id = SiteId::new("walmart")?;
//! let definition = registry.get(&site_id)?;
//!
//! println!("Site: {}", definition.name());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod definition;
pub mod error;
pub mod loader;
pub mod registry;

// Re-export commonly used types
pub use definition::{
    LocationMethod, LocationSelectors, ProductSelectors, RateLimitConfig, SearchConfig,
    SelectorSpec, SiteDefinition, SiteMetadata,
};
pub use error::{Result, SiteError};
pub use loader::SiteLoader;
pub use registry::SiteRegistry;
