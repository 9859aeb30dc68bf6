//! Product search result shaping.
//!
//! Catalog search payloads come in several shapes: availability may be a
//! matrix of available option combinations, a matrix of flag objects, a
//! variants list, or missing entirely. Each product's availability is
//! resolved once into [`Availability`] and the product is then filtered,
//! truncated and mapped to a [`DisplayProduct`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use shop_chat_core::{DEFAULT_PRODUCT_TITLE, DisplayProduct, PRICE_NOT_AVAILABLE};

const PLACEHOLDER_ID_LEN: usize = 6;

/// A variant option requested in the search call, e.g. `Size = 14`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFilter {
    /// Option name.
    #[serde(default)]
    pub name: String,
    /// Requested option value.
    pub value: String,
}

/// Variant filters carried by the search call arguments.
///
/// Each `filters[]` entry with a `variantOption` object contributes that
/// object; anything else is ignored.
#[must_use]
pub fn extract_variant_filters(arguments: &Value) -> Vec<VariantFilter> {
    arguments
        .get("filters")
        .and_then(Value::as_array)
        .map(|filters| {
            filters
                .iter()
                .filter_map(|f| f.get("variantOption"))
                .filter_map(|opt| serde_json::from_value(opt.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Availability of a catalog product, resolved from whichever schema it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// `availabilityMatrix` of available option combinations (`"Black/14"`).
    Combos(Vec<String>),
    /// `availabilityMatrix` of objects, reduced to their availability flag.
    Flags(Vec<bool>),
    /// `variants` list with each variant's `availableForSale`, if present.
    Variants(Vec<Option<bool>>),
    /// No availability data.
    Unknown,
}

impl Availability {
    /// Resolve availability from a raw product object.
    #[must_use]
    pub fn resolve(product: &Value) -> Self {
        if let Some(matrix) = product.get("availabilityMatrix").and_then(Value::as_array) {
            return match matrix.first() {
                None => Self::Combos(Vec::new()),
                Some(Value::String(_)) => Self::Combos(
                    matrix
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                ),
                Some(_) => Self::Flags(
                    matrix
                        .iter()
                        .map(|entry| {
                            is_true(entry.get("available")) || is_true(entry.get("availableForSale"))
                        })
                        .collect(),
                ),
            };
        }

        match product.get("variants").and_then(Value::as_array) {
            Some(variants) if !variants.is_empty() => Self::Variants(
                variants
                    .iter()
                    .map(|v| v.get("availableForSale").and_then(Value::as_bool))
                    .collect(),
            ),
            _ => Self::Unknown,
        }
    }

    /// Whether the product should be shown for the given variant filters.
    ///
    /// A combination matrix with filters needs one entry that contains every
    /// filter value (case-insensitive). Empty matrices always drop.
    #[must_use]
    pub fn keep(&self, filters: &[VariantFilter]) -> bool {
        match self {
            Self::Combos(entries) if entries.is_empty() => false,
            Self::Combos(entries) => {
                if filters.is_empty() {
                    return true;
                }
                let wanted: Vec<String> = filters.iter().map(|f| f.value.to_lowercase()).collect();
                entries.iter().any(|entry| {
                    let entry = entry.to_lowercase();
                    wanted.iter().all(|value| entry.contains(value.as_str()))
                })
            }
            Self::Flags(flags) => flags.iter().any(|available| *available),
            Self::Variants(variants) => variants.iter().any(|v| *v != Some(false)),
            Self::Unknown => true,
        }
    }

    const fn schema(&self) -> &'static str {
        match self {
            Self::Combos(_) => "combination matrix",
            Self::Flags(_) => "object matrix",
            Self::Variants(_) => "variants",
            Self::Unknown => "no availability data",
        }
    }
}

fn is_true(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

/// A catalog product with its availability resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    raw: Value,
    availability: Availability,
}

impl CatalogProduct {
    /// Wrap a raw product object.
    #[must_use]
    pub fn new(raw: Value) -> Self {
        let availability = Availability::resolve(&raw);
        Self { raw, availability }
    }

    /// Resolved availability.
    #[must_use]
    pub const fn availability(&self) -> &Availability {
        &self.availability
    }

    /// Name used in log lines.
    #[must_use]
    pub fn log_name(&self) -> String {
        text_field(&self.raw, "title")
            .or_else(|| text_field(&self.raw, "product_id"))
            .unwrap_or_else(|| "(unknown)".to_string())
    }

    /// Display-ready price label.
    ///
    /// A price source without an amount falls through to the next one.
    #[must_use]
    pub fn price_label(&self) -> String {
        let from_range = self
            .raw
            .get("price_range")
            .filter(|r| is_truthy(r))
            .and_then(|range| join_price(range.get("currency"), range.get("min")));

        from_range
            .or_else(|| {
                self.raw
                    .get("variants")
                    .and_then(Value::as_array)
                    .and_then(|v| v.first())
                    .and_then(|variant| join_price(variant.get("currency"), variant.get("price")))
            })
            .unwrap_or_else(|| PRICE_NOT_AVAILABLE.to_string())
    }

    /// Map to the card sent to the widget.
    #[must_use]
    pub fn into_display(self) -> DisplayProduct {
        let price = self.price_label();
        let raw = &self.raw;
        DisplayProduct {
            id: text_field(raw, "product_id").unwrap_or_else(placeholder_id),
            title: text_field(raw, "title").unwrap_or_else(|| DEFAULT_PRODUCT_TITLE.to_string()),
            price,
            image_url: text_field(raw, "image_url").unwrap_or_default(),
            description: text_field(raw, "description").unwrap_or_default(),
            url: text_field(raw, "url").unwrap_or_default(),
        }
    }
}

/// Turn a raw search tool result into at most `max_count` product cards.
///
/// `raw_response` is the tool result content (a list of content items) or an
/// object wrapping it under `content`. The first item's `text` holds the
/// search payload, either as an object or as a JSON-encoded string. Any
/// unexpected shape yields an empty list.
#[must_use]
pub fn normalize(raw_response: &Value, variant_filters: &[VariantFilter], max_count: usize) -> Vec<DisplayProduct> {
    let Some(payload) = search_payload(raw_response) else {
        debug!("Search result carried no parsable payload");
        return Vec::new();
    };

    let Some(products) = payload.get("products").and_then(Value::as_array) else {
        debug!("Search payload has no products array");
        return Vec::new();
    };

    if variant_filters.is_empty() {
        debug!(count = products.len(), "Checking product availability (no variant filters)");
    } else {
        debug!(
            count = products.len(),
            filters = ?variant_filters,
            "Checking product availability with variant filters"
        );
    }

    let cards: Vec<DisplayProduct> = products
        .iter()
        .cloned()
        .map(CatalogProduct::new)
        .filter(|product| {
            let keep = product.availability().keep(variant_filters);
            debug!(
                product = %product.log_name(),
                keep,
                schema = product.availability().schema(),
                "Availability decision"
            );
            keep
        })
        .take(max_count)
        .map(CatalogProduct::into_display)
        .collect();

    debug!(count = cards.len(), "Products to display after availability filter");
    cards
}

fn search_payload(raw_response: &Value) -> Option<Value> {
    let content = match raw_response {
        Value::Object(obj) => obj.get("content")?,
        other => other,
    };
    let text = content.as_array()?.first()?.get("text")?;

    match text {
        Value::String(encoded) => serde_json::from_str(encoded).ok(),
        Value::Object(_) => Some(text.clone()),
        _ => None,
    }
}

/// Non-empty textual value of a field; numbers are formatted as written.
fn text_field(obj: &Value, key: &str) -> Option<String> {
    let value = obj.get(key)?;
    if !is_truthy(value) {
        return None;
    }
    Some(scalar_text(value))
}

fn join_price(currency: Option<&Value>, amount: Option<&Value>) -> Option<String> {
    let amount = amount.map(scalar_text).filter(|a| !a.trim().is_empty())?;
    let currency = currency.map(scalar_text).unwrap_or_default();
    Some(format!("{currency} {amount}").trim().to_string())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_u64().map(|u| u.to_string()))
            .or_else(|| n.as_f64().map(|f| f.to_string()))
            .unwrap_or_else(|| n.to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Bool(true) | Value::Array(_) | Value::Object(_) => true,
    }
}

fn placeholder_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..PLACEHOLDER_ID_LEN)
        .map(|_| char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
        .collect();
    format!("product-{suffix}")
}
