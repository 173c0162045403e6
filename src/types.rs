//! Shared types read from the product feed and embedded into markup.
//!
//! [`Product`] mirrors one record of the external JSON feed and is never
//! mutated. [`ModalPayload`] is the subset a "view details" control carries
//! in its `data-product` attribute; the catalog writes it and the modal
//! parses it back, so both sides must agree on this one definition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Feed identifiers are numbers in some feeds and strings in others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Highest numbered `imageN` field consulted when picking a primary image.
pub const MAX_NUMBERED_IMAGE: usize = 10;

/// One product record of the feed.
///
/// Prices are integer minor units (centavos). Images may be spread over
/// `image`, `image0`, `image1`, ... `imageN`; the numbered fields are kept
/// in `extra` and read through [`Product::numbered_image`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,
    /// Discount percentage shown as a badge when greater than zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<u32>,
    #[serde(default, alias = "new")]
    pub is_new: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Remaining feed fields, including `image0..imageN`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Product {
    /// Non-empty `image{n}` field, if present.
    pub fn numbered_image(&self, n: usize) -> Option<&str> {
        self.extra
            .get(&format!("image{n}"))
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    fn plain_image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Primary image: `image0`, then `image`, then the first of
    /// `image1..image10` that is present.
    pub fn primary_image(&self) -> Option<&str> {
        self.numbered_image(0)
            .or_else(|| self.plain_image())
            .or_else(|| (1..=MAX_NUMBERED_IMAGE).find_map(|n| self.numbered_image(n)))
    }

    /// Every distinct image reference, primary first, then `image`, then the
    /// numbered fields in numeric order.
    pub fn image_refs(&self) -> Vec<String> {
        let mut numbered: Vec<(usize, &str)> = self
            .extra
            .keys()
            .filter_map(|key| key.strip_prefix("image")?.parse::<usize>().ok())
            .filter_map(|n| Some((n, self.numbered_image(n)?)))
            .collect();
        numbered.sort_by_key(|(n, _)| *n);

        let mut refs: Vec<String> = Vec::new();
        let candidates = self
            .primary_image()
            .into_iter()
            .chain(self.plain_image())
            .chain(numbered.into_iter().map(|(_, img)| img));
        for image in candidates {
            if !refs.iter().any(|r| r == image) {
                refs.push(image.to_string());
            }
        }
        refs
    }

    pub fn has_discount(&self) -> bool {
        self.discount.is_some_and(|d| d > 0)
    }
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("malformed product payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// What the detail modal needs to know about a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalPayload {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<u32>,
    /// Primary image (the placeholder when the product has none).
    pub image: String,
    pub images: Vec<String>,
    pub description: String,
    pub stock: u32,
    pub category: String,
    pub tags: Vec<String>,
}

impl ModalPayload {
    pub fn from_product(product: &Product, placeholder: &str) -> Self {
        let mut images = product.image_refs();
        if images.is_empty() {
            images.push(placeholder.to_string());
        }
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            original_price: product.original_price,
            discount: product.discount.filter(|d| *d > 0),
            image: images[0].clone(),
            images,
            description: product.description.clone(),
            stock: product.stock,
            category: product.category.clone(),
            tags: product.tags.clone(),
        }
    }

    /// JSON text for the `data-product` attribute. Quoting is left to the
    /// markup renderer, which escapes attribute values.
    pub fn to_json(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the (already entity-decoded) attribute value.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(value: serde_json::Value) -> Product {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_minimal_record() {
        let p = product(json!({"id": 1, "name": "Relógio", "price": 19990}));
        assert_eq!(p.id, ProductId::Number(1));
        assert!(!p.is_new);
        assert!(p.tags.is_empty());
        assert_eq!(p.primary_image(), None);
    }

    #[test]
    fn accepts_string_ids_and_new_alias() {
        let p = product(json!({"id": "sku-9", "name": "A", "price": 1, "new": true}));
        assert_eq!(p.id.to_string(), "sku-9");
        assert!(p.is_new);
    }

    #[test]
    fn primary_image_priority() {
        let p = product(json!({
            "id": 1, "name": "A", "price": 1,
            "image": "plain.jpg", "image0": "zero.jpg", "image2": "two.jpg"
        }));
        assert_eq!(p.primary_image(), Some("zero.jpg"));

        let p = product(json!({
            "id": 1, "name": "A", "price": 1,
            "image": "plain.jpg", "image2": "two.jpg"
        }));
        assert_eq!(p.primary_image(), Some("plain.jpg"));

        let p = product(json!({
            "id": 1, "name": "A", "price": 1,
            "image3": "three.jpg", "image7": "seven.jpg"
        }));
        assert_eq!(p.primary_image(), Some("three.jpg"));
    }

    #[test]
    fn blank_image_fields_are_ignored() {
        let p = product(json!({"id": 1, "name": "A", "price": 1, "image": " ", "image0": ""}));
        assert_eq!(p.primary_image(), None);
        assert!(p.image_refs().is_empty());
    }

    #[test]
    fn image_refs_are_ordered_and_distinct() {
        let p = product(json!({
            "id": 1, "name": "A", "price": 1,
            "image": "a.jpg", "image1": "b.jpg", "image12": "c.jpg", "image2": "a.jpg"
        }));
        assert_eq!(p.image_refs(), vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn payload_uses_placeholder_without_images() {
        let p = product(json!({"id": 1, "name": "A", "price": 1}));
        let payload = ModalPayload::from_product(&p, "placeholder.svg");
        assert_eq!(payload.image, "placeholder.svg");
        assert_eq!(payload.images, vec!["placeholder.svg"]);
    }

    #[test]
    fn payload_json_round_trip_with_quotes() {
        let p = product(json!({
            "id": 7, "name": "Relógio \"Clássico\" d'Or", "price": 19990,
            "originalPrice": 24990, "discount": 20, "image": "r.jpg",
            "description": "<b>bold</b> & more", "stock": 3,
            "category": "relogios", "tags": ["luxo", "aço"]
        }));
        let payload = ModalPayload::from_product(&p, "ph.svg");
        let parsed = ModalPayload::parse(&payload.to_json().unwrap()).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(matches!(
            ModalPayload::parse("{\"id\": 1, \"name\":"),
            Err(PayloadError::Malformed(_))
        ));
    }
}
