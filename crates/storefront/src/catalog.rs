//! Product catalog and debounced search.
//!
//! The full listing is cached with `moka` for the configured TTL. Search
//! results are never cached; the backend filters them on every call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kartwheel_core::Product;
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::api::StoreBackend;
use crate::error::Result;

/// Cache key for catalog responses.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Listing,
}

// =============================================================================
// Catalog
// =============================================================================

/// Read access to the product catalog.
///
/// Cheap to clone; clones share one cache.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    backend: Arc<dyn StoreBackend>,
    cache: Cache<CacheKey, Arc<Vec<Product>>>,
}

impl Catalog {
    /// Create a catalog whose listing stays cached for `ttl`.
    #[must_use]
    pub fn new(backend: Arc<dyn StoreBackend>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();

        Self {
            inner: Arc::new(CatalogInner { backend, cache }),
        }
    }

    /// Every product, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing is not cached and the backend fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>> {
        if let Some(products) = self.inner.cache.get(&CacheKey::Listing).await {
            debug!("Cache hit for product listing");
            return Ok(products.as_ref().clone());
        }

        let products = self.inner.backend.products().await?;

        self.inner
            .cache
            .insert(CacheKey::Listing, Arc::new(products.clone()))
            .await;

        Ok(products)
    }

    /// Drop the cached listing so the next read refetches it.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate(&CacheKey::Listing).await;
    }

    /// Products matching `query`.
    ///
    /// A blank query returns the full listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str) -> Result<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            return self.products().await;
        }
        self.inner.backend.search_products(query).await
    }
}

// =============================================================================
// ProductSearch
// =============================================================================

/// What became of a submitted search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The results are now the displayed list.
    Applied(Vec<Product>),
    /// A newer search was submitted; these results were discarded.
    Superseded,
}

/// Search-as-you-type with debounce.
///
/// Every [`submit`](Self::submit) takes a new generation number. A search
/// only touches the displayed list if no newer one was submitted while it
/// waited or ran, so a slow stale response can never overwrite a fresh one.
pub struct ProductSearch {
    catalog: Catalog,
    debounce: Duration,
    generation: AtomicU64,
    displayed: Mutex<Vec<Product>>,
}

impl ProductSearch {
    #[must_use]
    pub fn new(catalog: Catalog, debounce: Duration) -> Self {
        Self {
            catalog,
            debounce,
            generation: AtomicU64::new(0),
            displayed: Mutex::new(Vec::new()),
        }
    }

    /// Submit a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails while still current. Failures
    /// of superseded searches are swallowed.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn submit(&self, query: &str) -> Result<SearchOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            debug!(generation, "Search superseded during debounce");
            return Ok(SearchOutcome::Superseded);
        }

        let result = self.catalog.search(query).await;

        let mut displayed = self
            .displayed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(generation) {
            debug!(generation, "Discarding stale search results");
            return Ok(SearchOutcome::Superseded);
        }

        let products = result?;
        displayed.clone_from(&products);
        Ok(SearchOutcome::Applied(products))
    }

    /// The most recently applied results.
    #[must_use]
    pub fn displayed(&self) -> Vec<Product> {
        self.displayed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}
