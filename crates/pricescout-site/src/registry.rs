//! In-memory site definition registry.

use crate::{
    definition::SiteDefinition,
    error::{Result, SiteError},
    loader::SiteLoader,
};
use pricescout_core::SiteId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// In-memory cache of site definitions keyed by site ID.
///
/// The registry loads definitions from disk and caches them in memory for
/// fast lookups. Per-site scraping behavior is selected by looking up the
/// definition here rather than through any inheritance scheme.
#[derive(Clone)]
pub struct SiteRegistry {
    /// Cached site definitions, indexed by site ID
    definitions: Arc<RwLock<HashMap<SiteId, SiteDefinition>>>,
}

impl SiteRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a registry and load all definitions from the given loader.
    ///
    /// # Errors
    /// Returns error if loading fails.
    pub fn load_from(loader: &SiteLoader) -> Result<Self> {
        let registry = Self::new();
        registry.reload(loader)?;
        Ok(registry)
    }

    /// Reload all site definitions from the loader.
    ///
    /// This replaces the current cache with freshly loaded definitions.
    ///
    /// # Errors
    /// Returns error if loading fails.
    pub fn reload(&self, loader: &SiteLoader) -> Result<()> {
        let definitions = loader.load_all()?;

        let mut cache = self
            .definitions
            .write()
            .expect("acquire write lock on definitions");

        cache.clear();

        for definition in definitions {
            let site_id = definition.id().clone();
            cache.insert(site_id, definition);
        }

        info!(count = cache.len(), "reloaded site definitions");

        Ok(())
    }

    /// Get a site definition by ID.
    ///
    /// # Errors
    /// Returns error if the site is not found.
    pub fn get(&self, site_id: &SiteId) -> Result<SiteDefinition> {
        let cache = self
            .definitions
            .read()
            .expect("acquire read lock on definitions");

        cache
            .get(site_id)
            .cloned()
            .ok_or_else(|| SiteError::NotFound {
                site_id: site_id.to_string(),
            })
    }

    /// Get all site definitions.
    #[must_use]
    pub fn get_all(&self) -> Vec<SiteDefinition> {
        let cache = self
            .definitions
            .read()
            .expect("acquire read lock on definitions");

        cache.values().cloned().collect()
    }

    /// Get all site IDs in the registry.
    #[must_use]
    pub fn get_all_ids(&self) -> Vec<SiteId> {
        let cache = self
            .definitions
            .read()
            .expect("acquire read lock on definitions");

        cache.keys().cloned().collect()
    }

    /// Get the total number of sites in the registry.
    #[must_use]
    pub fn count(&self) -> usize {
        let cache = self
            .definitions
            .read()
            .expect("acquire read lock on definitions");

        cache.len()
    }

    /// Check if a site exists in the registry.
    #[must_use]
    pub fn contains(&self, site_id: &SiteId) -> bool {
        let cache = self
            .definitions
            .read()
            .expect("acquire read lock on definitions");

        cache.contains_key(site_id)
    }

    /// Add or update a site definition in the registry.
    ///
    /// This is useful for testing or dynamic updates.
    pub fn insert(&self, definition: SiteDefinition) -> Result<()> {
        definition.validate()?;

        let mut cache = self
            .definitions
            .write()
            .expect("acquire write lock on definitions");

        let site_id = definition.id().clone();
        cache.insert(site_id.clone(), definition);

        debug!(site_id = %site_id, "inserted site definition");

        Ok(())
    }

    /// Remove a site definition from the registry.
    ///
    /// Returns `true` if the site was present, `false` otherwise.
    pub fn remove(&self, site_id: &SiteId) -> bool {
        let mut cache = self
            .definitions
            .write()
            .expect("acquire write lock on definitions");

        let removed = cache.remove(site_id).is_some();

        if removed {
            debug!(site_id = %site_id, "removed site definition");
        }

        removed
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
