//! Cart reconciliation.
//!
//! Joins the backend's cart line items with catalog products into the
//! enriched cart the storefront displays. The result always replaces the
//! previous enriched cart wholesale; it is never applied as a patch.
//!
//! Guarantees for every output:
//! - at most one item per product ID, first occurrence wins
//! - every quantity is at least one
//! - every product ID exists in the catalog
//! - input order is preserved

use std::collections::{HashMap, HashSet};

use crate::types::{CartLineItem, EnrichedCartItem, Money, Product, ProductId};

/// Outcome of reconciling a remote cart against the catalog.
///
/// Besides the surviving items, records what was dropped and why so callers
/// can log data skew without treating it as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Surviving items, in remote order.
    pub items: Vec<EnrichedCartItem>,
    /// Line items whose product is missing from the catalog.
    pub orphaned: Vec<ProductId>,
    /// Line items with a zero or negative quantity.
    pub tombstoned: Vec<ProductId>,
    /// Repeated occurrences of an already-seen product ID.
    pub duplicates: Vec<ProductId>,
}

impl Reconciliation {
    /// Reconcile `remote` against `catalog`.
    #[must_use]
    pub fn build(remote: &[CartLineItem], catalog: &[Product]) -> Self {
        let mut by_id: HashMap<&ProductId, &Product> = HashMap::with_capacity(catalog.len());
        for product in catalog {
            by_id.entry(&product.id).or_insert(product);
        }

        let mut seen: HashSet<&ProductId> = HashSet::with_capacity(remote.len());
        let mut result = Self::default();

        for line in remote {
            if !seen.insert(&line.product_id) {
                result.duplicates.push(line.product_id.clone());
                continue;
            }

            if line.quantity <= 0 {
                result.tombstoned.push(line.product_id.clone());
                continue;
            }

            let Some(product) = by_id.get(&line.product_id) else {
                result.orphaned.push(line.product_id.clone());
                continue;
            };

            let quantity = u32::try_from(line.quantity).unwrap_or(u32::MAX);
            if let Some(item) = EnrichedCartItem::with_quantity((*product).clone(), quantity) {
                result.items.push(item);
            }
        }

        result
    }

    /// Whether anything in the remote cart was dropped.
    #[must_use]
    pub fn has_skew(&self) -> bool {
        !self.orphaned.is_empty() || !self.duplicates.is_empty()
    }
}

/// Merge remote line items with the catalog into enriched cart items.
///
/// Orphaned references, tombstones, and duplicate product IDs are dropped
/// silently. See [`Reconciliation`] for the details of what was dropped.
#[must_use]
pub fn reconcile(remote: &[CartLineItem], catalog: &[Product]) -> Vec<EnrichedCartItem> {
    Reconciliation::build(remote, catalog).items
}

/// Total value of the cart: the sum of `cost * quantity` over all items.
#[must_use]
pub fn total_value(items: &[EnrichedCartItem]) -> Money {
    items.iter().map(EnrichedCartItem::line_total).sum()
}

/// Total number of units in the cart.
#[must_use]
pub fn item_count(items: &[EnrichedCartItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity())).sum()
}

/// Order summary shown next to the read-only checkout cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    /// Number of distinct products.
    pub products: usize,
    /// Sum of line totals.
    pub subtotal: Money,
    /// Shipping charge. Shipping is free.
    pub shipping: Money,
    /// Amount charged to the wallet.
    pub total: Money,
}

impl OrderSummary {
    /// Summarize `items`.
    #[must_use]
    pub fn from_items(items: &[EnrichedCartItem]) -> Self {
        let subtotal = total_value(items);
        Self {
            products: items.len(),
            subtotal,
            shipping: Money::ZERO,
            total: subtotal,
        }
    }
}
