//! Output records for a scrape run.

use pricescout_core::{SiteId, Timestamp, Zipcode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scraped product.
///
/// Every optional field is `None` when its selectors missed or its raw text
/// failed to normalize; absent values serialize as `null`, never as zero.
/// `diagnostics` names the fields whose selectors all missed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product title. `None` when even the name selectors missed; the
    /// record is still emitted with its url and diagnostics.
    pub name: Option<String>,
    /// Product detail page URL.
    pub url: String,
    /// Site the product was scraped from.
    pub site: SiteId,
    /// Zipcode the pricing and availability apply to.
    pub zipcode: Zipcode,
    /// When the detail page was scraped.
    pub scraped_at: Timestamp,
    /// Current (possibly discounted) price.
    pub current_price: Option<f64>,
    /// Pre-discount price when the page shows one.
    pub original_price: Option<f64>,
    /// Markdown percentage, derived when both prices are present and the
    /// original is higher.
    pub discount_percent: Option<f64>,
    /// ISO currency code.
    pub currency: String,
    /// Whether the item can be purchased at this location.
    pub in_stock: Option<bool>,
    /// Raw availability phrase as shown on the page.
    pub stock_status_text: Option<String>,
    /// Remaining quantity when the page states one ("Only 3 left").
    pub quantity_available: Option<u32>,
    /// Average star rating, 0 to 5.
    pub rating_avg: Option<f64>,
    /// Number of ratings.
    pub rating_count: Option<u32>,
    /// Whether free shipping is offered.
    pub free_shipping: Option<bool>,
    /// Delivery estimate text.
    pub delivery_estimate: Option<String>,
    /// Brand name.
    pub brand: Option<String>,
    /// Key/value specification rows.
    pub specs: BTreeMap<String, String>,
    /// Names of fields whose selector candidates all missed.
    pub diagnostics: Vec<String>,
}

impl ProductRecord {
    /// A record with nothing extracted yet.
    #[must_use]
    pub fn empty(url: String, site: SiteId, zipcode: Zipcode) -> Self {
        Self {
            name: None,
            url,
            site,
            zipcode,
            scraped_at: Timestamp::now(),
            current_price: None,
            original_price: None,
            discount_percent: None,
            currency: "USD".to_string(),
            in_stock: None,
            stock_status_text: None,
            quantity_available: None,
            rating_avg: None,
            rating_count: None,
            free_shipping: None,
            delivery_estimate: None,
            brand: None,
            specs: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    /// All candidate products were processed (possibly zero).
    Done,
    /// The run stopped early; partial records are retained.
    Aborted(String),
}

/// The full result of one scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeReport {
    /// Site scraped.
    pub site: SiteId,
    /// Zipcode the run targeted.
    pub zipcode: Zipcode,
    /// Search query.
    pub query: String,
    /// Records emitted, in extraction order. Never dropped on abort.
    pub products: Vec<ProductRecord>,
    /// Terminal status.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run reached a terminal state.
    pub completed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_serialize_as_null() {
        let record = ProductRecord::empty(
            "https://example.com/item/1".to_string(),
            SiteId::new("walmart").unwrap(),
            Zipcode::new("94102").unwrap(),
        );

        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert!(json["current_price"].is_null());
        assert!(json["in_stock"].is_null());
        assert!(json["name"].is_null());
        assert_eq!(json["currency"], "USD");
    }

    #[test]
    fn test_run_status_round_trip() {
        let aborted = RunStatus::Aborted("cancelled".to_string());
        let json = serde_json::to_string(&aborted).unwrap();
        let back: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, aborted);
    }
}
