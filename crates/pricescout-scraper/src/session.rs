//! File-backed session cache with TTL expiry.
//!
//! One JSON file per (site, zipcode) pair under the cache directory. A hit
//! lets the workflow import cookies and skip the location UI entirely;
//! anything stale, missing, or unreadable is a miss. Writes go through a
//! temp file plus rename so a concurrent reader never sees a partial record.

use crate::error::{Result, ScrapeError};
use pricescout_core::{SiteId, Timestamp, Zipcode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default session lifetime in hours.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// A cached browser session for one (site, zipcode) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Site the cookies belong to.
    pub site: SiteId,
    /// Zipcode the session was established for.
    pub zipcode: Zipcode,
    /// Opaque cookie blob as exported by the browser adapter.
    pub cookie_blob: String,
    /// When the session was stored.
    pub created_at: Timestamp,
    /// When the session stops being usable.
    pub expires_at: Timestamp,
}

impl SessionRecord {
    /// Whether the record is still within its TTL.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Timestamp::now() < self.expires_at
    }
}

/// Disk-backed store of location sessions.
pub struct SessionStore {
    cache_dir: PathBuf,
    ttl: chrono::Duration,
}

impl SessionStore {
    /// Open a store rooted at `cache_dir`, creating the directory if needed.
    pub fn new(cache_dir: impl Into<PathBuf>, ttl_hours: i64) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)
            .map_err(|e| ScrapeError::SessionStore(format!("creating {}: {e}", cache_dir.display())))?;
        Ok(Self {
            cache_dir,
            ttl: chrono::Duration::hours(ttl_hours),
        })
    }

    /// Open a store in the default XDG cache location.
    pub fn with_default_dir() -> Result<Self> {
        let dir = pricescout_core::AppConfig::cache_dir()
            .map_err(|e| ScrapeError::SessionStore(e.to_string()))?;
        Self::new(dir.join("sessions"), DEFAULT_TTL_HOURS)
    }

    fn path_for(&self, site: &SiteId, zipcode: &Zipcode) -> PathBuf {
        self.cache_dir
            .join(format!("{}_{}.json", site.as_str(), zipcode.as_str()))
    }

    /// Fetch the session for a (site, zipcode) pair.
    ///
    /// Returns `None` when the file is absent, expired, or unreadable.
    /// Expired files are removed on the way out.
    pub fn get(&self, site: &SiteId, zipcode: &Zipcode) -> Option<SessionRecord> {
        let path = self.path_for(site, zipcode);
        let record = read_record(&path)?;

        if record.is_valid() {
            tracing::debug!(site = %site, zipcode = %zipcode, "session cache hit");
            Some(record)
        } else {
            tracing::debug!(site = %site, zipcode = %zipcode, "session expired, evicting");
            let _ = fs::remove_file(&path);
            None
        }
    }

    /// Store a cookie blob with expiry = now + TTL.
    pub fn put(&self, site: &SiteId, zipcode: &Zipcode, cookie_blob: String) -> Result<()> {
        let now = Timestamp::now();
        let record = SessionRecord {
            site: site.clone(),
            zipcode: zipcode.clone(),
            cookie_blob,
            created_at: now,
            expires_at: now.plus(self.ttl),
        };

        let path = self.path_for(site, zipcode);
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| ScrapeError::SessionStore(format!("serializing session: {e}")))?;

        // Atomic replace: readers either see the old file or the new one.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| ScrapeError::SessionStore(format!("writing {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| ScrapeError::SessionStore(format!("replacing {}: {e}", path.display())))?;

        tracing::debug!(site = %site, zipcode = %zipcode, "session stored");
        Ok(())
    }

    /// Remove the session for a (site, zipcode) pair if present.
    pub fn invalidate(&self, site: &SiteId, zipcode: &Zipcode) {
        let _ = fs::remove_file(self.path_for(site, zipcode));
    }

    /// Sweep the cache directory and remove every expired or unreadable
    /// session file. Returns the number of files removed.
    pub fn cleanup_expired(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stale = match read_record(&path) {
                Some(record) => !record.is_valid(),
                None => true,
            };
            if stale && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "cleaned up expired sessions");
        }
        removed
    }

    /// List the valid sessions currently stored for a site.
    pub fn list(&self, site: &SiteId) -> Vec<SessionRecord> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };

        let prefix = format!("{}_", site.as_str());
        let mut sessions: Vec<SessionRecord> = entries
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"))
            })
            .filter_map(|entry| read_record(&entry.path()))
            .filter(SessionRecord::is_valid)
            .collect();
        sessions.sort_by(|a, b| a.zipcode.as_str().cmp(b.zipcode.as_str()));
        sessions
    }
}

/// Read and parse a session file. Corrupt or unreadable files are a miss.
fn read_record(path: &Path) -> Option<SessionRecord> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt session file, treating as miss");
            None
        }
    }
}
