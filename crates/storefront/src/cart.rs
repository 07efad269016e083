//! Cart mutations kept in step with the remote cart.
//!
//! Every change is sent to the backend first and applied locally only once
//! the backend confirms it. Mutations hold the cart lock across their round
//! trip, so concurrent changes to one cart run one after another and never
//! lose an update.

use std::num::NonZeroU32;
use std::sync::Arc;

use kartwheel_core::{
    CartLineItem, EnrichedCartItem, Money, OrderSummary, ProductId, Reconciliation, item_count,
    total_value,
};
use secrecy::SecretString;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::api::StoreBackend;
use crate::catalog::Catalog;
use crate::error::{Result, StorefrontError};
use crate::session::SessionManager;

/// The shopper's cart.
pub struct CartService {
    backend: Arc<dyn StoreBackend>,
    catalog: Catalog,
    sessions: Arc<SessionManager>,
    items: Mutex<Vec<EnrichedCartItem>>,
}

impl CartService {
    #[must_use]
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        catalog: Catalog,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            backend,
            catalog,
            sessions,
            items: Mutex::new(Vec::new()),
        }
    }

    /// Fetch the remote cart and catalog and rebuild the local cart from
    /// them, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when logged out, or a backend error. The
    /// local cart is unchanged on error.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<EnrichedCartItem>> {
        let token = self.sessions.token()?;
        let mut items = self.items.lock().await;

        let (remote, catalog) =
            tokio::try_join!(self.backend.cart(&token), self.catalog.products())?;

        let reconciled = Reconciliation::build(&remote, &catalog);
        if reconciled.has_skew() {
            debug!(
                orphaned = ?reconciled.orphaned,
                duplicates = ?reconciled.duplicates,
                "Dropped cart lines that do not match the catalog"
            );
        }

        *items = reconciled.items;
        Ok(items.clone())
    }

    /// Add a product that is not in the cart yet.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` when logged out
    /// - `InvalidQuantity` for a quantity of zero
    /// - `DuplicateItem` if the product already has a line
    /// - `UnknownProduct` if the product is not in the catalog
    /// - a backend error, leaving the cart unchanged
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(&self, product_id: &ProductId, quantity: u32) -> Result<EnrichedCartItem> {
        let token = self.sessions.token()?;
        let quantity = NonZeroU32::new(quantity).ok_or(StorefrontError::InvalidQuantity)?;

        let mut items = self.items.lock().await;
        if items.iter().any(|item| item.product_id() == product_id) {
            return Err(StorefrontError::DuplicateItem(product_id.clone()));
        }

        let product = self
            .catalog
            .products()
            .await?
            .into_iter()
            .find(|p| &p.id == product_id)
            .ok_or_else(|| StorefrontError::UnknownProduct(product_id.clone()))?;

        let item = EnrichedCartItem::new(product, quantity);
        self.backend
            .upsert_cart_item(&token, &item.to_line_item())
            .await?;

        items.push(item.clone());
        Ok(item)
    }

    /// Set the quantity of a product already in the cart. Zero removes it.
    ///
    /// Returns the updated item, or `None` when it was removed.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated`, `ItemNotInCart`, or a backend error. The
    /// local quantity is unchanged on error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<EnrichedCartItem>> {
        let token = self.sessions.token()?;
        let mut items = self.items.lock().await;
        self.commit_quantity(&token, &mut items, product_id, quantity)
            .await
    }

    /// Add one to a product's quantity.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_quantity`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn increment(&self, product_id: &ProductId) -> Result<Option<EnrichedCartItem>> {
        self.step(product_id, |quantity| quantity.checked_add(1))
            .await
    }

    /// Take one from a product's quantity. Going below one removes it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_quantity`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn decrement(&self, product_id: &ProductId) -> Result<Option<EnrichedCartItem>> {
        self.step(product_id, |quantity| Some(quantity.saturating_sub(1)))
            .await
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_quantity`].
    pub async fn remove(&self, product_id: &ProductId) -> Result<()> {
        self.set_quantity(product_id, 0).await.map(|_| ())
    }

    /// A snapshot of the local cart.
    pub async fn items(&self) -> Vec<EnrichedCartItem> {
        self.items.lock().await.clone()
    }

    /// Total value of the local cart.
    pub async fn total(&self) -> Money {
        total_value(&self.items.lock().await)
    }

    /// Total number of units in the local cart.
    pub async fn item_count(&self) -> u64 {
        item_count(&self.items.lock().await)
    }

    pub async fn summary(&self) -> OrderSummary {
        OrderSummary::from_items(&self.items.lock().await)
    }

    /// Empty the local cart without touching the backend.
    ///
    /// Used after checkout (the backend empties its copy itself) and logout.
    pub async fn clear_local(&self) {
        self.items.lock().await.clear();
    }

    /// Hold the cart lock, e.g. to check out a cart nobody else can change.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Vec<EnrichedCartItem>> {
        self.items.lock().await
    }

    /// Lock the cart, read the current quantity and commit `next(current)`.
    async fn step(
        &self,
        product_id: &ProductId,
        next: impl FnOnce(u32) -> Option<u32> + Send,
    ) -> Result<Option<EnrichedCartItem>> {
        let token = self.sessions.token()?;
        let mut items = self.items.lock().await;

        let current = items
            .iter()
            .find(|item| item.product_id() == product_id)
            .map(EnrichedCartItem::quantity)
            .ok_or_else(|| StorefrontError::ItemNotInCart(product_id.clone()))?;
        let quantity = next(current).ok_or(StorefrontError::InvalidQuantity)?;

        self.commit_quantity(&token, &mut items, product_id, quantity)
            .await
    }

    async fn commit_quantity(
        &self,
        token: &SecretString,
        items: &mut Vec<EnrichedCartItem>,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<EnrichedCartItem>> {
        let index = items
            .iter()
            .position(|item| item.product_id() == product_id)
            .ok_or_else(|| StorefrontError::ItemNotInCart(product_id.clone()))?;

        let line = CartLineItem::new(product_id.clone(), i64::from(quantity));
        self.backend.upsert_cart_item(token, &line).await?;

        match NonZeroU32::new(quantity) {
            None => {
                items.remove(index);
                debug!("Removed cart line");
                Ok(None)
            }
            Some(quantity) => Ok(items.get_mut(index).map(|item| {
                item.set_quantity(quantity);
                item.clone()
            })),
        }
    }
}
