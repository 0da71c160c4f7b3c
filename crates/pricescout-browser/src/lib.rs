//! Browser session adapter for JavaScript-heavy retail sites.
//!
//! Provides the [`PageActions`] façade the scraping core programs against,
//! a chromiumoxide-backed implementation with anti-fingerprinting, and
//! cookie import/export for session reuse.

pub mod actions;
pub mod error;
pub mod fingerprint;
pub mod session;

pub use actions::{absolutize, PageActions};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
pub use session::{BrowserSession, PageHandle};
