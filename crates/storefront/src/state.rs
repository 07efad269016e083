//! The storefront as one object a front end talks to.

use std::sync::Arc;

use kartwheel_core::{Address, AddressId, EnrichedCartItem, OrderSummary, Product, ProductId};
use tracing::{instrument, warn};

use crate::address_book::AddressBook;
use crate::api::{ApiClient, StoreBackend};
use crate::auth::AuthService;
use crate::cart::CartService;
use crate::catalog::{Catalog, ProductSearch, SearchOutcome};
use crate::checkout::{CheckoutService, OrderReceipt};
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError, report};
use crate::notify::{Notice, Notifier};
use crate::session::{Session, SessionManager, SessionStore};

const LOGIN_TO_ADD: &str = "Login to add an item to the Cart";

const PRODUCTS_UNAVAILABLE: &str =
    "Could not fetch products. Check that the backend is running, reachable and returns valid JSON.";

/// Every storefront component behind one handle.
///
/// Each operation reports its failure to the log, Sentry and the notifier
/// before returning it, so callers only decide what to do next. Cheap to
/// clone; clones share all state.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    sessions: Arc<SessionManager>,
    catalog: Catalog,
    search: ProductSearch,
    cart: CartService,
    addresses: AddressBook,
    checkout: CheckoutService,
    auth: AuthService,
    notifier: Arc<dyn Notifier>,
}

impl Storefront {
    /// Create a storefront talking to the backend at `config.api_url`.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Box<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let backend = Arc::new(ApiClient::new(&config));
        Self::with_backend(config, backend, store, notifier)
    }

    /// Create a storefront over any backend.
    #[must_use]
    pub fn with_backend(
        config: StorefrontConfig,
        backend: Arc<dyn StoreBackend>,
        store: Box<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(store));
        let catalog = Catalog::new(backend.clone(), config.catalog_ttl);
        let search = ProductSearch::new(catalog.clone(), config.search_debounce);
        let cart = CartService::new(backend.clone(), catalog.clone(), sessions.clone());
        let addresses = AddressBook::new(backend.clone(), sessions.clone());
        let checkout = CheckoutService::new(backend.clone(), sessions.clone());
        let auth = AuthService::new(backend, sessions.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                sessions,
                catalog,
                search,
                cart,
                addresses,
                checkout,
                auth,
                notifier,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The logged-in shopper, if any.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.inner.sessions.current()
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn address_book(&self) -> &AddressBook {
        &self.inner.addresses
    }

    #[must_use]
    pub fn search(&self) -> &ProductSearch {
        &self.inner.search
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Pick up a stored session without contacting the backend.
    ///
    /// # Errors
    ///
    /// Returns a store error if the session store cannot be read.
    pub fn restore(&self) -> Result<Option<Session>> {
        self.settle(self.inner.auth.restore())
    }

    /// Pick up a stored session and, if there is one, load its cart and
    /// addresses.
    ///
    /// A failed load is reported and notified but does not undo the
    /// restored session.
    ///
    /// # Errors
    ///
    /// Returns a store error if the session store cannot be read.
    pub async fn start(&self) -> Result<Option<Session>> {
        let session = self.restore()?;
        if session.is_some() {
            self.refresh().await;
        }
        Ok(session)
    }

    /// Log in, then load the shopper's cart and addresses.
    ///
    /// The session is committed once the backend accepts the credentials.
    /// A failed load after that is reported and notified, and the login
    /// still succeeds.
    ///
    /// # Errors
    ///
    /// Returns a validation, backend or store error from the login itself.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let session = self.settle(self.inner.auth.login(username, password).await)?;
        self.notify(Notice::success("Logged in successfully"));
        self.refresh().await;
        Ok(session)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns a validation or backend error.
    #[instrument(skip(self, email, password, confirm))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<()> {
        self.settle(
            self.inner
                .auth
                .register(username, email, password, confirm)
                .await,
        )?;
        self.notify(Notice::success("Registered Successfully"));
        Ok(())
    }

    /// Log out and forget the local cart and addresses.
    ///
    /// # Errors
    ///
    /// Returns a store error if the session store cannot be cleared.
    pub async fn logout(&self) -> Result<()> {
        let result = self.inner.auth.logout();
        self.inner.cart.clear_local().await;
        self.inner.addresses.clear_local().await;
        self.settle(result)
    }

    /// Load the cart and addresses. Both are attempted; failures have
    /// already been settled.
    async fn refresh(&self) {
        let cart = self.load_cart().await.is_ok();
        let addresses = self.load_addresses().await.is_ok();
        if !(cart && addresses) {
            warn!(cart, addresses, "Session is active but not fully loaded");
        }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Every product.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn products(&self) -> Result<Vec<Product>> {
        let result = self.inner.catalog.products().await;
        self.settle_catalog(result)
    }

    /// Products matching `query`, without debounce.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let result = self.inner.catalog.search(query).await;
        self.settle_catalog(result)
    }

    /// Submit a search-as-you-type query.
    ///
    /// # Errors
    ///
    /// Returns a backend error for a search that was still current.
    pub async fn submit_search(&self, query: &str) -> Result<SearchOutcome> {
        let result = self.inner.search.submit(query).await;
        self.settle_catalog(result)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Reload the cart from the backend.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` or a backend error.
    pub async fn load_cart(&self) -> Result<Vec<EnrichedCartItem>> {
        self.settle(self.inner.cart.load().await)
    }

    /// Add a product that is not in the cart yet.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated`, `DuplicateItem`, `UnknownProduct`,
    /// `InvalidQuantity` or a backend error.
    pub async fn add_to_cart(&self, product_id: &ProductId, quantity: u32) -> Result<EnrichedCartItem> {
        let result = self.inner.cart.add_item(product_id, quantity).await;
        if let Err(err @ StorefrontError::NotAuthenticated) = &result {
            report(err);
            self.notify(Notice::warning(LOGIN_TO_ADD));
            return result;
        }
        let item = self.settle(result)?;
        self.notify(Notice::success("Item added to your cart"));
        Ok(item)
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated`, `ItemNotInCart` or a backend error.
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<EnrichedCartItem>> {
        self.settle(self.inner.cart.set_quantity(product_id, quantity).await)
    }

    /// # Errors
    ///
    /// Returns `NotAuthenticated`, `ItemNotInCart` or a backend error.
    pub async fn increment(&self, product_id: &ProductId) -> Result<Option<EnrichedCartItem>> {
        self.settle(self.inner.cart.increment(product_id).await)
    }

    /// # Errors
    ///
    /// Returns `NotAuthenticated`, `ItemNotInCart` or a backend error.
    pub async fn decrement(&self, product_id: &ProductId) -> Result<Option<EnrichedCartItem>> {
        self.settle(self.inner.cart.decrement(product_id).await)
    }

    /// # Errors
    ///
    /// Returns `NotAuthenticated`, `ItemNotInCart` or a backend error.
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<()> {
        self.settle(self.inner.cart.remove(product_id).await)
    }

    /// Products, subtotal and total of the local cart.
    pub async fn summary(&self) -> OrderSummary {
        self.inner.cart.summary().await
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Reload saved addresses.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` or a backend error.
    pub async fn load_addresses(&self) -> Result<Vec<Address>> {
        self.settle(self.inner.addresses.load().await)
    }

    /// # Errors
    ///
    /// Returns `Address(TooShort)`, `NotAuthenticated` or a backend error.
    pub async fn add_address(&self, text: &str) -> Result<Vec<Address>> {
        self.settle(self.inner.addresses.add(text).await)
    }

    /// Delete the address shown at `index`.
    ///
    /// # Errors
    ///
    /// Returns `AddressNotFound`, `NotAuthenticated` or a backend error.
    pub async fn delete_address(&self, index: usize) -> Result<Address> {
        self.settle(self.inner.addresses.delete(index).await)
    }

    /// Select the address shown at `index` for checkout.
    ///
    /// # Errors
    ///
    /// Returns `AddressNotFound`.
    pub async fn select_address(&self, index: usize) -> Result<AddressId> {
        self.settle(self.inner.addresses.select_index(index).await)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Whether the current cart could be checked out right now.
    ///
    /// # Errors
    ///
    /// Returns the first blocker that applies, without notifying.
    pub async fn can_checkout(&self) -> Result<()> {
        let address = self.inner.addresses.selected().await.map(|a| a.id);
        let items = self.inner.cart.items().await;
        self.inner.checkout.can_checkout(&items, address.as_ref())
    }

    /// Place the order for the current cart.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated`, a checkout blocker, or a backend error.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<OrderReceipt> {
        let receipt = self.settle(
            self.inner
                .checkout
                .checkout(&self.inner.cart, &self.inner.addresses)
                .await,
        )?;
        self.notify(Notice::success("Order placed successfully"));
        Ok(receipt)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    fn notify(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }

    fn settle<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            report(err);
            self.notify(Notice::new(err.severity(), err.user_message()));
        }
        result
    }

    fn settle_catalog<T>(&self, result: Result<T>) -> Result<T> {
        let unavailable = matches!(
            &result,
            Err(StorefrontError::BackendUnreachable(_) | StorefrontError::Decode(_))
        );
        if !unavailable {
            return self.settle(result);
        }
        if let Err(err) = &result {
            report(err);
        }
        self.notify(Notice::error(PRODUCTS_UNAVAILABLE));
        result
    }
}
