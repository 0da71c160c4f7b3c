//! Site definition loading from TOML files.
//!
//! This module handles loading site definitions from the `site-definitions/`
//! directory.

use crate::{
    definition::SiteDefinition,
    error::{Result, SiteError},
};
use pricescout_core::SiteId;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Loader for site definitions from TOML files.
pub struct SiteLoader {
    /// Base directory containing site definitions
    definitions_dir: PathBuf,
}

impl SiteLoader {
    /// Create a new loader with the given definitions directory.
    ///
    /// # Errors
    /// Returns error if the directory doesn't exist.
    pub fn new(definitions_dir: impl Into<PathBuf>) -> Result<Self> {
        let definitions_dir = definitions_dir.into();

        if !definitions_dir.is_dir() {
            return Err(SiteError::DirectoryNotFound {
                path: definitions_dir.display().to_string(),
            });
        }

        Ok(Self { definitions_dir })
    }

    /// Create a loader using the default definitions directory.
    ///
    /// Looks for `site-definitions/` relative to the workspace root.
    ///
    /// # Errors
    /// Returns error if the default directory doesn't exist.
    pub fn with_default_dir() -> Result<Self> {
        // Find workspace root by looking for Cargo.toml with [workspace]
        let mut current_dir = std::env::current_dir()?;

        loop {
            let cargo_toml = current_dir.join("Cargo.toml");
            if cargo_toml.exists() {
                if let Ok(contents) = std::fs::read_to_string(&cargo_toml) {
                    if contents.contains("[workspace]") {
                        let definitions_dir = current_dir.join("site-definitions");
                        return Self::new(definitions_dir);
                    }
                }
            }

            if let Some(parent) = current_dir.parent() {
                current_dir = parent.to_path_buf();
            } else {
                break;
            }
        }

        // Fallback: try relative path
        Self::new(PathBuf::from("site-definitions"))
    }

    /// Load a single site definition by ID.
    ///
    /// # Errors
    /// Returns error if the definition file doesn't exist, can't be read,
    /// or fails validation.
    pub fn load(&self, site_id: &SiteId) -> Result<SiteDefinition> {
        let filename = format!("{}.toml", site_id.as_str());

        let Some(path) = Self::find_file(&self.definitions_dir, &filename)? else {
            return Err(SiteError::NotFound {
                site_id: site_id.to_string(),
            });
        };

        let definition = Self::load_from_path(&path)?;
        definition.validate()?;

        debug!(
            site_id = %site_id,
            name = %definition.name(),
            "loaded site definition"
        );

        Ok(definition)
    }

    /// Load all site definitions from the definitions directory.
    ///
    /// Invalid definitions are logged as warnings and skipped.
    ///
    /// # Errors
    /// Returns error if the directory can't be read.
    pub fn load_all(&self) -> Result<Vec<SiteDefinition>> {
        let mut definitions = Vec::new();

        Self::walk_and_load_recursive(&self.definitions_dir, &mut definitions)?;

        info!(
            count = definitions.len(),
            dir = %self.definitions_dir.display(),
            "loaded site definitions"
        );

        Ok(definitions)
    }

    /// Recursively walk directory and load all TOML files.
    fn walk_and_load_recursive(dir: &Path, definitions: &mut Vec<SiteDefinition>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                Self::walk_and_load_recursive(&path, definitions)?;
            } else if path.extension().and_then(|s| s.to_str()) == Some("toml") {
                match Self::load_from_path(&path) {
                    Ok(definition) => {
                        if let Err(e) = definition.validate() {
                            warn!(
                                path = %path.display(),
                                error = %e,
                                "skipping invalid site definition"
                            );
                            continue;
                        }
                        definitions.push(definition);
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "failed to load site definition"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Recursively search for a file by name.
    fn find_file(dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                if let Some(found) = Self::find_file(&path, filename)? {
                    return Ok(Some(found));
                }
            } else if path.file_name().and_then(|s| s.to_str()) == Some(filename) {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    /// Load a site definition from a specific file path.
    fn load_from_path(path: &Path) -> Result<SiteDefinition> {
        let contents = std::fs::read_to_string(path).map_err(|e| SiteError::LoadError {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        toml::from_str(&contents).map_err(|e| SiteError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_definition_file(dir: &Path, site_id: &str) -> PathBuf {
        let file_path = dir.join(format!("{site_id}.toml"));

        let content = format!(
            r##"
[site]
id = "{site_id}"
name = "Test Site"
base_url = "https://test.com"

[rate_limit]
requests_per_minute = 10
min_delay_seconds = 1.0
max_delay_seconds = 3.0

[location]
method = "cookie-modal"

[location.selectors]
location_button = ["#location-btn"]
zipcode_input = ["input[name='zip']"]
submit_button = ["button[type='submit']"]

[search]
url_template = "https://test.com/search?q={{query}}"
product_link = {{ candidates = ["a.product"], attr = "href" }}

[product]
name = ["h1.title"]
current_price = [".price-now"]
"##
        );

        std::fs::write(&file_path, content).expect("write test file");
        file_path
    }

    #[test]
    fn test_loader_new_with_existing_dir() {
        let temp_dir = TempDir::new().expect("create temp dir");
        assert!(SiteLoader::new(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_loader_new_with_nonexistent_dir() {
        assert!(SiteLoader::new("/nonexistent/path/to/definitions").is_err());
    }

    #[test]
    fn test_load_single_site() {
        let temp_dir = TempDir::new().expect("create temp dir");
        create_test_definition_file(temp_dir.path(), "test-site");

        let loader = SiteLoader::new(temp_dir.path()).expect("create loader");
        let site_id = SiteId::new("test-site").expect("valid site ID");
        let definition = loader.load(&site_id).expect("load site definition");

        assert_eq!(definition.id(), &site_id);
        assert_eq!(definition.name(), "Test Site");
    }

    #[test]
    fn test_load_nonexistent_site() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let loader = SiteLoader::new(temp_dir.path()).expect("create loader");
        let site_id = SiteId::new("nonexistent").expect("valid site ID");

        let result = loader.load(&site_id);
        assert!(matches!(result.unwrap_err(), SiteError::NotFound { .. }));
    }

    #[test]
    fn test_load_all_sites() {
        let temp_dir = TempDir::new().expect("create temp dir");
        create_test_definition_file(temp_dir.path(), "site-a");
        create_test_definition_file(temp_dir.path(), "site-b");

        let loader = SiteLoader::new(temp_dir.path()).expect("create loader");
        let definitions = loader.load_all().expect("load all definitions");

        assert_eq!(definitions.len(), 2);
    }

    #[test]
    fn test_load_all_skips_invalid() {
        let temp_dir = TempDir::new().expect("create temp dir");
        create_test_definition_file(temp_dir.path(), "valid-site");

        let invalid_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&invalid_path, "invalid toml content [[[").expect("write invalid file");

        let loader = SiteLoader::new(temp_dir.path()).expect("create loader");
        let definitions = loader.load_all().expect("load all definitions");

        assert_eq!(definitions.len(), 1);
    }

    #[test]
    fn test_find_file_in_nested_directories() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let nested_dir = temp_dir.path().join("retail");
        std::fs::create_dir_all(&nested_dir).expect("create nested dir");
        create_test_definition_file(&nested_dir, "nested-site");

        let loader = SiteLoader::new(temp_dir.path()).expect("create loader");
        let site_id = SiteId::new("nested-site").expect("valid site ID");
        let definition = loader.load(&site_id).expect("load nested definition");

        assert_eq!(definition.id().as_str(), "nested-site");
    }
}
