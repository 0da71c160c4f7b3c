//! Chromiumoxide-backed browser session.
//!
//! One [`BrowserSession`] owns one Chromium instance; [`PageHandle`] wraps a
//! tab and implements the [`PageActions`] façade the scraping core uses.

use crate::actions::PageActions;
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::Page;
use futures_util::stream::StreamExt;
use std::time::Duration;

/// Markers that identify an anti-bot or rate-limit interstitial rather than
/// real page content. Sites serve these with a 200 as often as with a 429,
/// so the body is checked regardless of navigation outcome.
const BLOCK_MARKERS: &[&str] = &[
    "too many requests",
    "request unsuccessful",
    "access denied",
    "are you a robot",
    "px-captcha",
    "g-recaptcha",
];

fn looks_blocked(html: &str) -> bool {
    let lower = html.to_lowercase();
    BLOCK_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A launched Chromium instance with a fixed fingerprint.
pub struct BrowserSession {
    browser: Browser,
    fingerprint: FingerprintConfig,
    navigation_timeout: Duration,
}

impl BrowserSession {
    /// Launch a browser with a randomized fingerprint.
    pub async fn launch(headless: bool) -> Result<Self> {
        Self::launch_with_fingerprint(headless, FingerprintConfig::randomized()).await
    }

    /// Launch a browser with a specific fingerprint.
    ///
    /// Automation-signal suppression flags are applied here, at open time;
    /// everything above the [`PageActions`] trait is unaware of them.
    pub async fn launch_with_fingerprint(
        headless: bool,
        fingerprint: FingerprintConfig,
    ) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage");

        if !headless {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Drive the CDP event loop for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        tracing::debug!(
            user_agent = %fingerprint.user_agent,
            viewport = format!("{}x{}", fingerprint.viewport_width, fingerprint.viewport_height),
            "launched browser session"
        );

        Ok(Self {
            browser,
            fingerprint,
            navigation_timeout: Duration::from_secs(30),
        })
    }

    /// Override the navigation timeout (default 30s).
    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Open a fresh page with the session fingerprint applied.
    pub async fn open_page(&self) -> Result<PageHandle> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        page.set_user_agent(self.fingerprint.user_agent.as_str())
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        Ok(PageHandle {
            page,
            navigation_timeout: self.navigation_timeout,
        })
    }

    /// Shut the browser down.
    pub async fn shutdown(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(())
    }
}

/// A single tab, implementing the page façade.
pub struct PageHandle {
    page: Page,
    navigation_timeout: Duration,
}

impl PageHandle {
    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }
}

#[async_trait::async_trait]
impl PageActions for PageHandle {
    async fn navigate(&self, url: &str) -> Result<()> {
        let goto = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            Ok::<(), BrowserError>(())
        };

        tokio::time::timeout(self.navigation_timeout, goto)
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigation to {url}")))??;

        let html = self.content().await?;
        if looks_blocked(&html) {
            tracing::warn!(url, "anti-bot interstitial detected");
            return Err(BrowserError::TransientBlock { status: 429 });
        }

        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>> {
        let Ok(element) = self.page.find_element(selector).await else {
            return Ok(None);
        };

        let text = element
            .inner_text()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        Ok(text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
    }

    async fn read_attr_all(&self, selector: &str, attr: &str, limit: usize) -> Result<Vec<String>> {
        let Ok(elements) = self.page.find_elements(selector).await else {
            return Ok(Vec::new());
        };

        let mut values = Vec::new();
        for element in elements {
            if values.len() >= limit {
                break;
            }
            let value = element
                .attribute(attr)
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            if let Some(value) = value {
                let value = value.trim().to_string();
                if !value.is_empty() {
                    values.push(value);
                }
            }
        }

        Ok(values)
    }

    async fn extract_table(&self, selector: &str) -> Result<Vec<(String, String)>> {
        let encoded = serde_json::to_string(selector)
            .map_err(|e| BrowserError::ChromiumError(format!("selector encode: {e}")))?;
        let script = format!(
            r"(() => {{
                const table = document.querySelector({sel});
                if (!table) return [];
                return Array.from(table.querySelectorAll('tr'))
                    .map(row => {{
                        const cells = row.querySelectorAll('th, td');
                        if (cells.length < 2) return null;
                        return [cells[0].innerText.trim(), cells[1].innerText.trim()];
                    }})
                    .filter(pair => pair && pair[0] && pair[1]);
            }})()",
            sel = encoded,
        );

        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| BrowserError::ChromiumError(format!("table extraction: {e}")))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;

        element
            .click()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        element
            .type_str(value)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;

        element
            .click()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        Ok(())
    }

    async fn export_cookies(&self) -> Result<String> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        serde_json::to_string(&cookies).map_err(|e| BrowserError::CookieError(e.to_string()))
    }

    async fn import_cookies(&self, blob: &str) -> Result<()> {
        // The exported cookie JSON carries a superset of the CookieParam
        // fields; unknown fields are dropped during deserialization.
        let cookies: Vec<CookieParam> =
            serde_json::from_str(blob).map_err(|e| BrowserError::CookieError(e.to_string()))?;

        self.page
            .set_cookies(cookies)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_marker_detection() {
        assert!(looks_blocked(
            "<html><body><h1>Too Many Requests</h1></body></html>"
        ));
        assert!(looks_blocked(r#"<div class="g-recaptcha"></div>"#));
        assert!(looks_blocked("<title>Access Denied</title>"));
        assert!(!looks_blocked(
            "<html><body><h1>Gaming Laptop</h1><span>$899.00</span></body></html>"
        ));
    }
}
