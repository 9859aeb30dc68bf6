//! Display-ready product card.

use serde::{Deserialize, Serialize};

/// Title used when the catalog returns none.
pub const DEFAULT_PRODUCT_TITLE: &str = "Product";

/// Price label used when no price field can be resolved.
pub const PRICE_NOT_AVAILABLE: &str = "Price not available";

/// A product card as sent to the widget in `product_results` events.
///
/// Every field is always populated; missing catalog data is defaulted when
/// the card is built, never on the rendering side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayProduct {
    /// Catalog product ID, or a generated `product-…` placeholder.
    pub id: String,
    /// Product title.
    pub title: String,
    /// Pre-formatted price, e.g. `USD 12`.
    pub price: String,
    /// Image URL (empty when unknown).
    #[serde(default)]
    pub image_url: String,
    /// Description (empty when unknown).
    #[serde(default)]
    pub description: String,
    /// Product page URL (empty when unknown).
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_product_wire_names() {
        let product = DisplayProduct {
            id: "gid://shopify/Product/1".to_string(),
            title: "Band".to_string(),
            price: "USD 12".to_string(),
            image_url: "https://cdn/img.png".to_string(),
            description: String::new(),
            url: String::new(),
        };
        let json = serde_json::to_string(&product).expect("serialize");
        assert!(json.contains("\"image_url\":\"https://cdn/img.png\""));
    }

    #[test]
    fn test_display_product_tolerates_missing_optional_fields() {
        let product: DisplayProduct =
            serde_json::from_str(r#"{"id":"p","title":"T","price":"USD 1"}"#).expect("parse");
        assert!(product.image_url.is_empty());
        assert!(product.url.is_empty());
    }
}
