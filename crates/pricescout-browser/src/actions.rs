use crate::error::{BrowserError, Result};

/// Page-level browser actions the scraping core drives.
///
/// This is the adapter boundary: the workflow and selector resolver only
/// ever see this trait, so tests substitute a mock page and production code
/// uses the chromiumoxide-backed [`crate::PageHandle`].
///
/// All operations may suspend for network/render completion. Locator misses
/// are a normal outcome for the read methods (`Ok(None)` / empty vec);
/// `fill` and `click` report a miss as [`BrowserError::SelectorNotFound`]
/// because interaction targets are required by their callers.
#[async_trait::async_trait]
pub trait PageActions: Send + Sync {
    /// Navigate the page to a URL and wait for it to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Read the text content of the first element matching `selector`,
    /// in document order. `Ok(None)` when nothing matches.
    async fn read_text(&self, selector: &str) -> Result<Option<String>>;

    /// Read an attribute from every element matching `selector`, capped at
    /// `limit` values. Empty when nothing matches.
    async fn read_attr_all(&self, selector: &str, attr: &str, limit: usize) -> Result<Vec<String>>;

    /// Extract key/value rows from a table-shaped element (specification
    /// tables). Empty when the table or its rows are missing.
    async fn extract_table(&self, selector: &str) -> Result<Vec<(String, String)>>;

    /// Fill a form field.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Click an element.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Export the session's cookies as an opaque blob.
    ///
    /// The core stores and restores this blob without interpreting it.
    async fn export_cookies(&self) -> Result<String>;

    /// Import a previously exported cookie blob into this session.
    async fn import_cookies(&self, blob: &str) -> Result<()>;

    /// Close the page and release its resources.
    async fn close(&self) -> Result<()>;
}

/// Resolve a possibly-relative link against a base URL.
pub fn absolutize(base_url: &str, link: &str) -> Result<String> {
    if link.starts_with("http://") || link.starts_with("https://") {
        return Ok(link.to_string());
    }

    let base = url::Url::parse(base_url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid base URL: {}", e)))?;

    base.join(link)
        .map(|u| u.to_string())
        .map_err(|e| BrowserError::NavigationError(format!("Invalid link '{}': {}", link, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize_relative_link() {
        assert_eq!(
            absolutize("https://www.walmart.com", "/ip/laptop/123").unwrap(),
            "https://www.walmart.com/ip/laptop/123"
        );
    }

    #[test]
    fn test_absolutize_keeps_absolute_link() {
        assert_eq!(
            absolutize("https://www.walmart.com", "https://cdn.example.com/x").unwrap(),
            "https://cdn.example.com/x"
        );
    }
}
