//! Multi-candidate selector resolution.
//!
//! Retail pages change markup constantly, so every logical field carries an
//! ordered list of candidate selectors. Resolution tries them in order and
//! stops at the first candidate that matches anything; later candidates are
//! never probed once one hits. Exhausting the list is a normal outcome,
//! reported as `None`.

use crate::error::Result;
use pricescout_browser::PageActions;
use pricescout_site::SelectorSpec;

/// The raw text pulled from a page for one field, plus which candidate
/// selector produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedField {
    /// Raw extracted text, untrimmed of semantic noise (currency symbols,
    /// phrases); normalizers deal with that.
    pub value: String,
    /// Index into the spec's candidate list of the selector that matched.
    pub candidate_index: usize,
}

/// Resolve a spec to a single value.
///
/// When the spec names an attribute, that attribute of the first matching
/// element is read; otherwise the element's text.
pub async fn resolve(
    page: &dyn PageActions,
    spec: &SelectorSpec,
) -> Result<Option<ExtractedField>> {
    for (index, candidate) in spec.candidates.iter().enumerate() {
        let value = match &spec.attr {
            Some(attr) => page
                .read_attr_all(candidate, attr, 1)
                .await?
                .into_iter()
                .next(),
            None => page.read_text(candidate).await?,
        };

        if let Some(value) = value {
            if index > 0 {
                tracing::debug!(candidate = %candidate, index, "fallback selector matched");
            }
            return Ok(Some(ExtractedField {
                value,
                candidate_index: index,
            }));
        }
    }

    Ok(None)
}

/// Resolve a spec to many values, up to `limit`.
///
/// All values come from the first candidate that yields any; candidates are
/// fallbacks for each other, not sources to merge.
pub async fn resolve_all(
    page: &dyn PageActions,
    spec: &SelectorSpec,
    limit: usize,
) -> Result<Vec<String>> {
    for candidate in &spec.candidates {
        let values = match &spec.attr {
            Some(attr) => page.read_attr_all(candidate, attr, limit).await?,
            None => page.read_text(candidate).await?.into_iter().collect(),
        };
        if !values.is_empty() {
            return Ok(values);
        }
    }

    Ok(Vec::new())
}

/// Resolve a spec to key/value table rows, used for product spec sheets.
pub async fn resolve_table(
    page: &dyn PageActions,
    spec: &SelectorSpec,
) -> Result<Vec<(String, String)>> {
    for candidate in &spec.candidates {
        let rows = page.extract_table(candidate).await?;
        if !rows.is_empty() {
            return Ok(rows);
        }
    }

    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Page stub that serves canned text per selector and logs every probe.
    struct ProbePage {
        text: HashMap<String, String>,
        probes: Mutex<Vec<String>>,
    }

    impl ProbePage {
        fn new(text: &[(&str, &str)]) -> Self {
            Self {
                text: text
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                probes: Mutex::new(Vec::new()),
            }
        }

        fn probed(&self) -> Vec<String> {
            self.probes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageActions for ProbePage {
        async fn navigate(&self, _url: &str) -> pricescout_browser::Result<()> {
            Ok(())
        }

        async fn read_text(&self, selector: &str) -> pricescout_browser::Result<Option<String>> {
            self.probes.lock().unwrap().push(selector.to_string());
            Ok(self.text.get(selector).cloned())
        }

        async fn read_attr_all(
            &self,
            selector: &str,
            _attr: &str,
            _limit: usize,
        ) -> pricescout_browser::Result<Vec<String>> {
            self.probes.lock().unwrap().push(selector.to_string());
            Ok(self.text.get(selector).cloned().into_iter().collect())
        }

        async fn extract_table(
            &self,
            selector: &str,
        ) -> pricescout_browser::Result<Vec<(String, String)>> {
            self.probes.lock().unwrap().push(selector.to_string());
            Ok(self
                .text
                .get(selector)
                .map(|v| vec![("Brand".to_string(), v.clone())])
                .unwrap_or_default())
        }

        async fn fill(&self, _selector: &str, _value: &str) -> pricescout_browser::Result<()> {
            Ok(())
        }

        async fn click(&self, _selector: &str) -> pricescout_browser::Result<()> {
            Ok(())
        }

        async fn export_cookies(&self) -> pricescout_browser::Result<String> {
            Ok(String::new())
        }

        async fn import_cookies(&self, _blob: &str) -> pricescout_browser::Result<()> {
            Ok(())
        }

        async fn close(&self) -> pricescout_browser::Result<()> {
            Ok(())
        }
    }

    fn spec(candidates: &[&str]) -> SelectorSpec {
        SelectorSpec {
            candidates: candidates.iter().map(|c| (*c).to_string()).collect(),
            attr: None,
        }
    }

    #[tokio::test]
    async fn test_first_match_wins_later_candidates_not_probed() {
        let page = ProbePage::new(&[(".b", "from b"), (".c", "from c")]);
        let result = resolve(&page, &spec(&[".a", ".b", ".c"])).await.unwrap();

        let field = result.unwrap();
        assert_eq!(field.value, "from b");
        assert_eq!(field.candidate_index, 1);
        // A was tried and missed, B hit, C never queried.
        assert_eq!(page.probed(), vec![".a", ".b"]);
    }

    #[tokio::test]
    async fn test_all_candidates_exhausted_returns_none() {
        let page = ProbePage::new(&[]);
        let result = resolve(&page, &spec(&[".a", ".b"])).await.unwrap();
        assert!(result.is_none());
        assert_eq!(page.probed(), vec![".a", ".b"]);
    }

    #[tokio::test]
    async fn test_preferred_candidate_short_circuits() {
        let page = ProbePage::new(&[(".a", "preferred"), (".b", "fallback")]);
        let result = resolve(&page, &spec(&[".a", ".b"])).await.unwrap();

        let field = result.unwrap();
        assert_eq!(field.value, "preferred");
        assert_eq!(field.candidate_index, 0);
        assert_eq!(page.probed(), vec![".a"]);
    }

    #[tokio::test]
    async fn test_resolve_all_uses_first_yielding_candidate() {
        let page = ProbePage::new(&[(".links", "/item/1")]);
        let spec = SelectorSpec {
            candidates: vec![".missing".to_string(), ".links".to_string()],
            attr: Some("href".to_string()),
        };

        let values = resolve_all(&page, &spec, 10).await.unwrap();
        assert_eq!(values, vec!["/item/1"]);
    }

    #[tokio::test]
    async fn test_resolve_table_falls_through_empty_candidates() {
        let page = ProbePage::new(&[(".specs", "Acme")]);
        let rows = resolve_table(&page, &spec(&[".missing", ".specs"]))
            .await
            .unwrap();
        assert_eq!(rows, vec![("Brand".to_string(), "Acme".to_string())]);
    }
}
