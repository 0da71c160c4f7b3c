//! PriceScout Core - Shared types and configuration.
//!
//! This crate provides the common newtypes, the application configuration
//! layer, and the base error type used across the PriceScout workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{CoreError, Result};
pub use types::{SiteId, Timestamp, Zipcode};
