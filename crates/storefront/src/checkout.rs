//! Placing an order.
//!
//! The wallet is charged on the backend; the new balance is computed here
//! and committed to the session only after the backend accepts the order.

use std::sync::Arc;

use kartwheel_core::{AddressId, EnrichedCartItem, Money, can_checkout, prepare_order};
use serde::Serialize;
use tracing::{info, instrument};

use crate::address_book::AddressBook;
use crate::api::StoreBackend;
use crate::cart::CartService;
use crate::error::{Result, add_breadcrumb};
use crate::session::SessionManager;

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub new_balance: Money,
    pub address_id: AddressId,
    pub total_cost: Money,
}

/// Validates and places orders.
pub struct CheckoutService {
    backend: Arc<dyn StoreBackend>,
    sessions: Arc<SessionManager>,
}

impl CheckoutService {
    #[must_use]
    pub fn new(backend: Arc<dyn StoreBackend>, sessions: Arc<SessionManager>) -> Self {
        Self { backend, sessions }
    }

    /// Whether `cart` could be checked out to `address` right now.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when logged out, otherwise the first
    /// checkout blocker that applies.
    pub fn can_checkout(&self, cart: &[EnrichedCartItem], address: Option<&AddressId>) -> Result<()> {
        let balance = self.sessions.balance()?;
        can_checkout(cart, address, balance)?;
        Ok(())
    }

    /// Check out the cart to the selected address.
    ///
    /// The cart and the address book stay locked for the whole round trip,
    /// so the selected address cannot be deleted under the order. On
    /// success the new balance is committed and the local cart emptied; on
    /// any failure both are left as they were.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated`, a checkout blocker, or a backend error
    /// carrying the backend's message.
    #[instrument(skip(self, cart, addresses))]
    pub async fn checkout(&self, cart: &CartService, addresses: &AddressBook) -> Result<OrderReceipt> {
        let token = self.sessions.token()?;
        let balance = self.sessions.balance()?;
        let book = addresses.lock_selection().await;

        let mut items = cart.lock().await;
        let order = prepare_order(&items, book.selected_id(), balance)?;

        self.backend.checkout(&token, &order.address_id).await?;

        self.sessions.set_balance(order.new_balance)?;
        items.clear();
        drop(items);
        drop(book);

        info!(
            total = %order.total,
            new_balance = %order.new_balance,
            "Order placed"
        );
        add_breadcrumb(
            "checkout",
            "Order placed",
            &[("address_id", order.address_id.as_str())],
        );

        Ok(OrderReceipt {
            new_balance: order.new_balance,
            address_id: order.address_id,
            total_cost: order.total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use kartwheel_core::{CartLineItem, CheckoutBlocker};

    use super::*;
    use crate::catalog::Catalog;
    use crate::error::StorefrontError;
    use crate::session::{MemoryStore, Session};
    use crate::testing::{FakeBackend, address};

    struct Fixture {
        backend: Arc<FakeBackend>,
        sessions: Arc<SessionManager>,
        cart: CartService,
        addresses: AddressBook,
        checkout: CheckoutService,
    }

    async fn fixture(balance: i64, lines: Vec<CartLineItem>) -> Fixture {
        let backend = Arc::new(
            FakeBackend::with_catalog()
                .with_cart(lines)
                .with_addresses(vec![address("a1"), address("a2")]),
        );
        let sessions = Arc::new(SessionManager::new(Box::new(MemoryStore::new())));
        sessions
            .start(Session::new("tok", "crio.do", Money::from_units(balance)))
            .unwrap();

        let catalog = Catalog::new(backend.clone(), Duration::from_secs(300));
        let cart = CartService::new(backend.clone(), catalog, sessions.clone());
        let addresses = AddressBook::new(backend.clone(), sessions.clone());
        let checkout = CheckoutService::new(backend.clone(), sessions.clone());
        cart.load().await.unwrap();
        addresses.load().await.unwrap();

        Fixture {
            backend,
            sessions,
            cart,
            addresses,
            checkout,
        }
    }

    #[tokio::test]
    async fn test_checkout_success() {
        let f = fixture(5000, vec![CartLineItem::new("p1", 2)]).await;
        f.addresses.select(&AddressId::new("a2")).await.unwrap();

        let receipt = f.checkout.checkout(&f.cart, &f.addresses).await.unwrap();

        assert_eq!(receipt.total_cost, Money::from_units(200));
        assert_eq!(receipt.new_balance, Money::from_units(4800));
        assert_eq!(receipt.address_id.as_str(), "a2");
        assert_eq!(f.sessions.balance().unwrap(), Money::from_units(4800));
        assert!(f.cart.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_balance_rejected_locally() {
        let f = fixture(150, vec![CartLineItem::new("p1", 2)]).await;
        f.addresses.select(&AddressId::new("a1")).await.unwrap();

        let err = f.checkout.checkout(&f.cart, &f.addresses).await.unwrap_err();

        assert!(matches!(
            err,
            StorefrontError::Checkout(CheckoutBlocker::InsufficientBalance { .. })
        ));
        assert_eq!(f.sessions.balance().unwrap(), Money::from_units(150));
        assert_eq!(f.cart.items().await.len(), 1);
        assert_eq!(f.backend.call_count("checkout"), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_checked_before_address() {
        let f = fixture(5000, vec![]).await;

        let err = f.checkout.checkout(&f.cart, &f.addresses).await.unwrap_err();

        assert!(matches!(err, StorefrontError::Checkout(CheckoutBlocker::EmptyCart)));
    }

    #[tokio::test]
    async fn test_no_address_selected() {
        let f = fixture(5000, vec![CartLineItem::new("p3", 1)]).await;

        let err = f.checkout.checkout(&f.cart, &f.addresses).await.unwrap_err();

        assert!(matches!(
            err,
            StorefrontError::Checkout(CheckoutBlocker::NoAddressSelected)
        ));
    }

    #[tokio::test]
    async fn test_backend_rejection_leaves_balance() {
        let f = fixture(5000, vec![CartLineItem::new("p1", 1)]).await;
        f.addresses.select(&AddressId::new("a1")).await.unwrap();
        f.backend
            .fail_with(400, "Wallet balance not sufficient to place order");

        let err = f.checkout.checkout(&f.cart, &f.addresses).await.unwrap_err();

        assert_eq!(
            err.user_message(),
            "Wallet balance not sufficient to place order"
        );
        assert_eq!(f.sessions.balance().unwrap(), Money::from_units(5000));
        assert_eq!(f.cart.items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_waits_for_checkout() {
        let f = fixture(5000, vec![CartLineItem::new("p1", 1)]).await;
        let a1 = AddressId::new("a1");
        f.addresses.select(&a1).await.unwrap();
        f.backend.delay_call("checkout", Duration::from_millis(50));

        let (receipt, deleted) = tokio::join!(
            f.checkout.checkout(&f.cart, &f.addresses),
            async {
                tokio::task::yield_now().await;
                f.addresses.delete_by_id(&a1).await
            }
        );

        assert_eq!(receipt.unwrap().address_id, a1);
        assert_eq!(deleted.unwrap().id, a1);
        let calls = f.backend.calls();
        let placed = calls.iter().position(|c| *c == "checkout").unwrap();
        let removed = calls.iter().position(|c| *c == "delete_address").unwrap();
        assert!(placed < removed);
    }

    #[tokio::test]
    async fn test_can_checkout() {
        let f = fixture(150, vec![CartLineItem::new("p2", 1)]).await;
        let items = f.cart.items().await;
        let a1 = AddressId::new("a1");

        assert!(f.checkout.can_checkout(&items, Some(&a1)).is_ok());
        assert!(f.checkout.can_checkout(&items, None).is_err());
        assert!(f.checkout.can_checkout(&[], Some(&a1)).is_err());
    }

    #[test]
    fn test_receipt_serializes_camel_case() {
        let receipt = OrderReceipt {
            new_balance: Money::from_units(4800),
            address_id: AddressId::new("a1"),
            total_cost: Money::from_units(200),
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert!(json.get("newBalance").is_some());
        assert!(json.get("totalCost").is_some());
        assert_eq!(json["addressId"], "a1");
    }
}
