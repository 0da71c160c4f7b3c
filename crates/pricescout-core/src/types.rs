//! Shared newtypes used across the PriceScout workspace.
//!
//! These wrap raw strings and timestamps with validation so that a site
//! identifier or zipcode that reaches the scraping core is known to be
//! well-formed.

use crate::error::CoreError;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Newtype for site identifiers with validation.
///
/// Site IDs must be lowercase alphanumeric with hyphens, 2-40 characters
/// (e.g. "walmart", "best-buy").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(String);

impl SiteId {
    /// Create a new `SiteId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), CoreError> {
        static SITE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = SITE_REGEX
            .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,38}[a-z0-9]$").expect("valid regex"));

        if id.len() < 2 || id.len() > 40 {
            return Err(CoreError::Validation(format!(
                "invalid site ID: must be 2-40 characters, got {} characters",
                id.len()
            )));
        }

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "invalid site ID: must be lowercase alphanumeric with hyphens, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype for US zipcodes with validation.
///
/// Accepts the 5-digit form only; the location-setting flows on every
/// supported site take 5-digit input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zipcode(String);

impl Zipcode {
    /// Create a new `Zipcode` from a string.
    ///
    /// # Errors
    /// Returns error if the value is not exactly five ASCII digits.
    pub fn new(zip: impl Into<String>) -> Result<Self, CoreError> {
        let zip = zip.into();
        if zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(zip))
        } else {
            Err(CoreError::Validation(format!(
                "invalid zipcode: must be exactly 5 digits, got '{zip}'"
            )))
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Zipcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, CoreError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| CoreError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get seconds since Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    /// Return a timestamp offset into the future by `duration`.
    #[must_use]
    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
