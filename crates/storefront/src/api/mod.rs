//! Store backend access.
//!
//! # Architecture
//!
//! - The backend is the source of truth for products, carts, addresses and
//!   the wallet balance. Nothing is synced locally beyond read-through caches.
//! - [`StoreBackend`] is the seam every service talks through; [`ApiClient`]
//!   is the `reqwest` implementation against the REST API.
//!
//! # Endpoints
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `products` | no |
//! | GET | `products/search?value=` | no |
//! | GET, PUT | `cart` | bearer |
//! | POST | `cart/checkout` | bearer |
//! | GET | `users/getAddress` | bearer |
//! | POST | `users/addAddress` | bearer |
//! | DELETE | `users/deleteAddress/{id}` | bearer |
//! | POST | `auth/login`, `auth/register` | no |

mod client;
pub mod types;

pub use client::ApiClient;
pub use types::LoginResponse;

use async_trait::async_trait;
use kartwheel_core::{
    Address, AddressId, AddressText, CartLineItem, Email, Password, Product, Username,
};
use secrecy::SecretString;

use crate::error::Result;

/// Operations the storefront needs from the store backend.
///
/// Authenticated calls take the session token explicitly.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Every product in the catalog.
    async fn products(&self) -> Result<Vec<Product>>;

    /// Products matching `query`. No matches is an empty list, not an error.
    async fn search_products(&self, query: &str) -> Result<Vec<Product>>;

    /// The caller's cart as stored remotely.
    async fn cart(&self, token: &SecretString) -> Result<Vec<CartLineItem>>;

    /// Insert or update a cart line. A quantity of zero deletes it.
    async fn upsert_cart_item(&self, token: &SecretString, item: &CartLineItem) -> Result<()>;

    /// The caller's saved addresses.
    async fn addresses(&self, token: &SecretString) -> Result<Vec<Address>>;

    /// Save a new address and return the updated list.
    async fn add_address(&self, token: &SecretString, text: &AddressText)
    -> Result<Vec<Address>>;

    /// Delete a saved address.
    async fn delete_address(&self, token: &SecretString, id: &AddressId) -> Result<()>;

    /// Place an order for the current cart, shipped to `address_id`.
    async fn checkout(&self, token: &SecretString, address_id: &AddressId) -> Result<()>;

    /// Exchange credentials for a session token.
    async fn login(&self, username: &Username, password: &Password) -> Result<LoginResponse>;

    /// Create an account.
    async fn register(&self, username: &Username, email: &Email, password: &Password)
    -> Result<()>;
}
