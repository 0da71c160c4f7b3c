//! JSON and CSV serialization of scrape reports.

use anyhow::Context;
use pricescout_scraper::ScrapeReport;
use std::io::Write;

/// Write the full report as pretty-printed JSON. Absent fields appear
/// as `null`.
pub fn write_json(report: &ScrapeReport, writer: impl Write) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, report).context("serializing report to JSON")
}

/// Write the product records as CSV, one row per product.
///
/// Specification rows are folded into a single `key: value; key: value`
/// column; absent fields become empty cells.
pub fn write_csv(report: &ScrapeReport, writer: impl Write) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record([
        "name",
        "url",
        "site",
        "zipcode",
        "scraped_at",
        "current_price",
        "original_price",
        "discount_percent",
        "currency",
        "in_stock",
        "stock_status",
        "quantity_available",
        "rating_avg",
        "rating_count",
        "free_shipping",
        "delivery_estimate",
        "brand",
        "specs",
        "diagnostics",
    ])
    .context("writing CSV header")?;

    for product in &report.products {
        let specs = product
            .specs
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");

        csv.write_record([
            product.name.clone().unwrap_or_default(),
            product.url.clone(),
            product.site.to_string(),
            product.zipcode.to_string(),
            product.scraped_at.to_rfc3339(),
            opt_to_cell(product.current_price),
            opt_to_cell(product.original_price),
            opt_to_cell(product.discount_percent),
            product.currency.clone(),
            opt_to_cell(product.in_stock),
            product.stock_status_text.clone().unwrap_or_default(),
            opt_to_cell(product.quantity_available),
            opt_to_cell(product.rating_avg),
            opt_to_cell(product.rating_count),
            opt_to_cell(product.free_shipping),
            product.delivery_estimate.clone().unwrap_or_default(),
            product.brand.clone().unwrap_or_default(),
            specs,
            product.diagnostics.join("; "),
        ])
        .context("writing CSV row")?;
    }

    csv.flush().context("flushing CSV output")?;
    Ok(())
}

fn opt_to_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
