//! Cart line items.
//!
//! A [`CartLineItem`] is the backend's view of a cart entry: a product ID and
//! a quantity. An [`EnrichedCartItem`] joins that with the full product
//! record and is what the storefront displays and totals.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::types::id::{LineId, ProductId};
use crate::types::money::Money;
use crate::types::product::Product;

/// A cart entry as stored by the backend.
///
/// A quantity of zero (or below) is a tombstone for a just-removed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product in the cart.
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    /// Requested quantity.
    #[serde(alias = "qty")]
    pub quantity: i64,
}

impl CartLineItem {
    /// Create a line item.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A cart line joined with its product record.
///
/// Always has a quantity of at least one; removal is modeled by dropping the
/// item, never by a zero quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedCartItem {
    line_id: LineId,
    product: Product,
    quantity: NonZeroU32,
}

impl EnrichedCartItem {
    /// Create an enriched item for `product`.
    #[must_use]
    pub fn new(product: Product, quantity: NonZeroU32) -> Self {
        Self {
            line_id: LineId::from(&product.id),
            product,
            quantity,
        }
    }

    /// Create an enriched item, or `None` if `quantity` is zero.
    #[must_use]
    pub fn with_quantity(product: Product, quantity: u32) -> Option<Self> {
        NonZeroU32::new(quantity).map(|quantity| Self::new(product, quantity))
    }

    /// Stable identifier of this cart line.
    #[must_use]
    pub const fn line_id(&self) -> &LineId {
        &self.line_id
    }

    /// The full product record.
    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    /// ID of the product on this line.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Quantity on this line (always at least one).
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    /// Replace the quantity in place.
    pub const fn set_quantity(&mut self, quantity: NonZeroU32) {
        self.quantity = quantity;
    }

    /// Cost of this line: unit cost times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.product.cost.times(self.quantity.get())
    }

    /// The backend form of this line.
    #[must_use]
    pub fn to_line_item(&self) -> CartLineItem {
        CartLineItem {
            product_id: self.product.id.clone(),
            quantity: i64::from(self.quantity.get()),
        }
    }
}
