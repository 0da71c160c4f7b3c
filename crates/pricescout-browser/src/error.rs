use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("transient block (HTTP {status}-equivalent)")]
    TransientBlock { status: u16 },

    #[error("cookie blob error: {0}")]
    CookieError(String),
}

impl BrowserError {
    /// Whether the failure is a rate-limit/anti-bot signal worth retrying
    /// with backoff rather than treating as a hard error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrowserError::TransientBlock { .. } | BrowserError::Timeout(_)
        )
    }
}
