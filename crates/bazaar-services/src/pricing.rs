//! Price classification for ad submissions.
//!
//! Matching is by product name against the active catalog. Featured and
//! carousel placements each add their own entry; a plain listing pays the
//! base entry, substituted by the international entry when the business
//! category equals the configured worldwide classification.

use bazaar_core::models::AdSettings;
use bazaar_payments::PriceEntry;

pub const FEATURED_PRODUCT: &str = "top_add_price";
pub const CAROUSEL_PRODUCT: &str = "carosal_add_price";
pub const BASE_PRODUCT: &str = "base_price";
pub const INTERNATIONAL_PRODUCT: &str = "international_add_price";

/// De-duplicated matched entries plus the summed amount in minor units.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub price_ids: Vec<String>,
    pub amount_minor: i64,
}

impl PriceQuote {
    pub fn is_empty(&self) -> bool {
        self.price_ids.is_empty()
    }
}

/// Classify a submission against the catalog. Deterministic: the same
/// settings, category and catalog always produce the same quote.
pub fn classify_pricing(
    settings: &AdSettings,
    category: &str,
    worldwide_category: &str,
    catalog: &[PriceEntry],
) -> PriceQuote {
    let mut wanted: Vec<&str> = Vec::new();
    if settings.featured {
        wanted.push(FEATURED_PRODUCT);
    }
    if settings.carousel {
        wanted.push(CAROUSEL_PRODUCT);
    }
    if !settings.featured && !settings.carousel {
        if category == worldwide_category {
            wanted.push(INTERNATIONAL_PRODUCT);
        } else {
            wanted.push(BASE_PRODUCT);
        }
    }

    let mut price_ids: Vec<String> = Vec::new();
    let mut amount_minor: i64 = 0;
    for product in wanted {
        for entry in catalog.iter().filter(|e| e.product_name == product) {
            if !price_ids.contains(&entry.price_id) {
                price_ids.push(entry.price_id.clone());
                amount_minor += entry.amount_minor;
            }
        }
    }

    PriceQuote {
        price_ids,
        amount_minor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLDWIDE: &str = "Sri Lankan Worldwide Restaurant";

    fn catalog() -> Vec<PriceEntry> {
        vec![
            PriceEntry {
                price_id: "price_base".to_string(),
                product_name: BASE_PRODUCT.to_string(),
                amount_minor: 1500,
            },
            PriceEntry {
                price_id: "price_top".to_string(),
                product_name: FEATURED_PRODUCT.to_string(),
                amount_minor: 3000,
            },
            PriceEntry {
                price_id: "price_carousel".to_string(),
                product_name: CAROUSEL_PRODUCT.to_string(),
                amount_minor: 2500,
            },
            PriceEntry {
                price_id: "price_intl".to_string(),
                product_name: INTERNATIONAL_PRODUCT.to_string(),
                amount_minor: 5000,
            },
        ]
    }

    fn settings(featured: bool, carousel: bool) -> AdSettings {
        AdSettings {
            featured,
            carousel,
            has_halal: false,
        }
    }

    #[test]
    fn test_plain_listing_pays_base() {
        let quote = classify_pricing(&settings(false, false), "Restaurant", WORLDWIDE, &catalog());
        assert_eq!(quote.price_ids, vec!["price_base"]);
        assert_eq!(quote.amount_minor, 1500);
    }

    #[test]
    fn test_worldwide_category_pays_international() {
        let quote = classify_pricing(&settings(false, false), WORLDWIDE, WORLDWIDE, &catalog());
        assert_eq!(quote.price_ids, vec!["price_intl"]);
        assert_eq!(quote.amount_minor, 5000);
    }

    #[test]
    fn test_featured_and_carousel_sum_both() {
        let quote = classify_pricing(&settings(true, true), "Restaurant", WORLDWIDE, &catalog());
        assert_eq!(quote.price_ids, vec!["price_top", "price_carousel"]);
        assert_eq!(quote.amount_minor, 5500);
    }

    #[test]
    fn test_featured_skips_base() {
        let quote = classify_pricing(&settings(true, false), WORLDWIDE, WORLDWIDE, &catalog());
        assert_eq!(quote.price_ids, vec!["price_top"]);
    }

    #[test]
    fn test_duplicate_entries_counted_once() {
        let mut duplicated = catalog();
        duplicated.push(PriceEntry {
            price_id: "price_base".to_string(),
            product_name: BASE_PRODUCT.to_string(),
            amount_minor: 1500,
        });
        let quote =
            classify_pricing(&settings(false, false), "Restaurant", WORLDWIDE, &duplicated);
        assert_eq!(quote.price_ids, vec!["price_base"]);
        assert_eq!(quote.amount_minor, 1500);
    }

    #[test]
    fn test_empty_catalog_yields_empty_quote() {
        let quote = classify_pricing(&settings(false, false), "Restaurant", WORLDWIDE, &[]);
        assert!(quote.is_empty());
        assert_eq!(quote.amount_minor, 0);
    }

    #[test]
    fn test_deterministic() {
        let a = classify_pricing(&settings(true, false), "Restaurant", WORLDWIDE, &catalog());
        let b = classify_pricing(&settings(true, false), "Restaurant", WORLDWIDE, &catalog());
        assert_eq!(a, b);
    }
}
