//! Catalog product records.

use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;
use crate::types::money::Money;

/// A product available to buy.
///
/// Immutable once fetched; the backend is the source of truth. The wire
/// format uses `_id` and `image`, but `id` and `imageUrl` are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    /// Product name or title.
    pub name: String,
    /// Category the product belongs to.
    #[serde(default)]
    pub category: String,
    /// Unit price.
    pub cost: Money,
    /// Aggregate rating, an integer out of five.
    #[serde(default)]
    pub rating: u8,
    /// URL of the product image.
    #[serde(rename = "image", alias = "imageUrl", default)]
    pub image_url: String,
}

impl Product {
    /// Highest rating a product can have.
    pub const MAX_RATING: u8 = 5;

    /// Rating clamped to the 0-5 scale.
    #[must_use]
    pub fn stars(&self) -> u8 {
        self.rating.min(Self::MAX_RATING)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{
            "_id": "BW0jAAeDJmlZCF8i",
            "name": "Tan Leatherette Weekender Duffle",
            "category": "Fashion",
            "cost": 150,
            "rating": 4,
            "image": "https://crio-directus-assets.s3.ap-south-1.amazonaws.com/ff071a1c.png"
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "BW0jAAeDJmlZCF8i");
        assert_eq!(product.cost, Money::from_units(150));
        assert_eq!(product.stars(), 4);
        assert!(product.image_url.ends_with(".png"));
    }

    #[test]
    fn test_deserialize_alternate_field_names() {
        let json = r#"{"id": "p1", "name": "Lamp", "cost": 100, "imageUrl": "lamp.png"}"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.image_url, "lamp.png");
        assert_eq!(product.rating, 0);
        assert!(product.category.is_empty());
    }

    #[test]
    fn test_stars_clamped() {
        let product = Product {
            id: ProductId::new("p1"),
            name: "Lamp".to_string(),
            category: String::new(),
            cost: Money::from_units(1),
            rating: 9,
            image_url: String::new(),
        };
        assert_eq!(product.stars(), 5);
    }
}
