//! Text normalizers for raw extracted fields.
//!
//! Retail pages wrap every number in noise ("Now $1,299.00", "4.5 out of
//! 5 stars", "Only 3 left!"). These functions pull the data out or return
//! `None`; they never guess.

use regex::Regex;
use std::sync::OnceLock;

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$?\s*(\d[\d,]*(?:\.\d+)?)").expect("valid regex"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"))
}

fn count_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d[\d,]*)").expect("valid regex"))
}

fn quantity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)only\s+(\d+)\s+left").expect("valid regex"))
}

/// Parse a price string to a non-negative amount.
///
/// Handles currency symbols, thousands separators, and surrounding copy.
/// Price ranges ("$899.00 - $1,199.00") resolve to the minimum.
pub fn normalize_price(text: &str) -> Option<f64> {
    price_regex()
        .captures_iter(text)
        .filter_map(|cap| cap[1].replace(',', "").parse::<f64>().ok())
        .filter(|price| *price >= 0.0 && price.is_finite())
        .fold(None, |min: Option<f64>, price| match min {
            Some(m) if m <= price => Some(m),
            _ => Some(price),
        })
}

/// Parse a star rating, accepting only values in the 0 to 5 range.
pub fn normalize_rating(text: &str) -> Option<f64> {
    let rating: f64 = number_regex().captures(text)?[1].parse().ok()?;
    if (0.0..=5.0).contains(&rating) {
        Some(rating)
    } else {
        None
    }
}

/// Parse a review or rating count ("1,234 ratings").
pub fn parse_count(text: &str) -> Option<u32> {
    count_regex().captures(text)?[1].replace(',', "").parse().ok()
}

/// Interpret an availability phrase.
///
/// Returns (in stock, quantity when the page states one). Unknown phrasing
/// is treated as in stock; explicit out-of-stock language wins over the
/// quantity pattern.
pub fn parse_availability(text: &str) -> (bool, Option<u32>) {
    let lower = text.to_lowercase();

    const OUT_OF_STOCK: &[&str] = &[
        "out of stock",
        "sold out",
        "currently unavailable",
        "not available",
        "unavailable",
    ];
    if OUT_OF_STOCK.iter().any(|phrase| lower.contains(phrase)) {
        return (false, None);
    }

    let quantity = quantity_regex()
        .captures(text)
        .and_then(|cap| cap[1].parse().ok());
    (true, quantity)
}

/// Percentage discount of `current` relative to `original`, one decimal
/// place. `None` unless both prices are positive and `original > current`.
pub fn compute_discount(original: f64, current: f64) -> Option<f64> {
    if original > current && current >= 0.0 && original > 0.0 {
        Some((100.0 * (original - current) / original * 10.0).round() / 10.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_with_symbol_and_commas() {
        assert_eq!(normalize_price("$1,299.00"), Some(1299.0));
    }

    #[test]
    fn test_price_with_surrounding_copy() {
        assert_eq!(normalize_price("Now $899.99"), Some(899.99));
        assert_eq!(normalize_price("current price $45"), Some(45.0));
    }

    #[test]
    fn test_price_range_takes_minimum() {
        assert_eq!(normalize_price("$899.00 - $1,199.00"), Some(899.0));
    }

    #[test]
    fn test_price_garbage_is_none() {
        assert_eq!(normalize_price("See price in cart"), None);
        assert_eq!(normalize_price(""), None);
    }

    #[test]
    fn test_rating_from_phrase() {
        assert_eq!(normalize_rating("4.5 out of 5 stars"), Some(4.5));
        assert_eq!(normalize_rating("3"), Some(3.0));
        assert_eq!(normalize_rating("0"), Some(0.0));
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        assert_eq!(normalize_rating("9.7"), None);
        assert_eq!(normalize_rating("87% positive"), None);
    }

    #[test]
    fn test_rating_without_number_is_none() {
        assert_eq!(normalize_rating("no ratings yet"), None);
    }

    #[test]
    fn test_count_with_separators() {
        assert_eq!(parse_count("1,234 ratings"), Some(1234));
        assert_eq!(parse_count("(56 reviews)"), Some(56));
        assert_eq!(parse_count("be the first to review"), None);
    }

    #[test]
    fn test_availability_out_of_stock_phrases() {
        assert_eq!(parse_availability("Out of stock"), (false, None));
        assert_eq!(parse_availability("Sold out online"), (false, None));
        assert_eq!(parse_availability("Currently unavailable"), (false, None));
    }

    #[test]
    fn test_availability_in_stock_with_quantity() {
        assert_eq!(parse_availability("In stock"), (true, None));
        assert_eq!(parse_availability("Only 3 left!"), (true, Some(3)));
        assert_eq!(parse_availability("only 12 left in stock"), (true, Some(12)));
    }

    #[test]
    fn test_availability_unknown_defaults_in_stock() {
        assert_eq!(parse_availability("Pickup today at San Jose"), (true, None));
    }

    #[test]
    fn test_discount_percentage() {
        assert_eq!(compute_discount(100.0, 75.0), Some(25.0));
        assert_eq!(compute_discount(1299.0, 999.0), Some(23.1));
    }

    #[test]
    fn test_discount_requires_real_markdown() {
        assert_eq!(compute_discount(100.0, 100.0), None);
        assert_eq!(compute_discount(75.0, 100.0), None);
        assert_eq!(compute_discount(0.0, 0.0), None);
    }
}
