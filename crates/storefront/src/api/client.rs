//! REST client for the store backend.
//!
//! Uses `reqwest` 0.13 with JSON bodies and bearer-token authentication.

use std::sync::Arc;

use async_trait::async_trait;
use kartwheel_core::{
    Address, AddressId, AddressText, CartLineItem, Email, Password, Product, Username,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::StoreBackend;
use super::types::{
    AddAddressRequest, AddressPayload, ApiErrorBody, CartPayload, CheckoutRequest, LoginRequest,
    LoginResponse, RegisterRequest,
};
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};

/// Longest slice of a response body written to the log.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the store backend's REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the backend named in `config`.
    #[must_use]
    pub fn new(config: &StorefrontConfig) -> Self {
        Self::with_base_url(config.api_url.clone())
    }

    /// Create a client rooted at `base_url`.
    ///
    /// Endpoint paths are joined onto it, so it should end with `/`.
    #[must_use]
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url,
            }),
        }
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.inner.base_url.join(path).map_err(|e| {
            StorefrontError::BackendUnreachable(format!("invalid endpoint '{path}': {e}"))
        })?;
        Ok(self.inner.client.request(method, url))
    }

    fn authed(&self, method: Method, path: &str, token: &SecretString) -> Result<RequestBuilder> {
        Ok(self.request(method, path)?.bearer_auth(token.expose_secret()))
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = rejection_message(status, &body);
            tracing::error!(
                status = %status,
                body = %truncate(&body),
                "Backend returned non-success status"
            );
            return Err(StorefrontError::BackendRejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Send a request and decode the JSON body of a successful response.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse backend response"
            );
            StorefrontError::from(e)
        })
    }
}

#[async_trait]
impl StoreBackend for ApiClient {
    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>> {
        let products: Vec<Product> = self.fetch(self.request(Method::GET, "products")?).await?;
        debug!(count = products.len(), "Fetched products");
        Ok(products)
    }

    #[instrument(skip(self), fields(query = %query))]
    async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let path = format!("products/search?value={}", urlencoding::encode(query));
        match self.fetch(self.request(Method::GET, &path)?).await {
            Ok(products) => Ok(products),
            // The backend answers 404 when nothing matches
            Err(StorefrontError::BackendRejected { status: 404, .. }) => {
                debug!("No products match search");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, token))]
    async fn cart(&self, token: &SecretString) -> Result<Vec<CartLineItem>> {
        let payload: CartPayload = self.fetch(self.authed(Method::GET, "cart", token)?).await?;
        Ok(payload.into_line_items())
    }

    #[instrument(skip(self, token), fields(product_id = %item.product_id, quantity = item.quantity))]
    async fn upsert_cart_item(&self, token: &SecretString, item: &CartLineItem) -> Result<()> {
        let request = self.authed(Method::PUT, "cart", token)?.json(item);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn addresses(&self, token: &SecretString) -> Result<Vec<Address>> {
        let payload: AddressPayload = self
            .fetch(self.authed(Method::GET, "users/getAddress", token)?)
            .await?;
        Ok(payload.into_addresses())
    }

    #[instrument(skip(self, token, text))]
    async fn add_address(
        &self,
        token: &SecretString,
        text: &AddressText,
    ) -> Result<Vec<Address>> {
        let request = self
            .authed(Method::POST, "users/addAddress", token)?
            .json(&AddAddressRequest {
                new_address: text.as_str(),
            });
        let payload: AddressPayload = self.fetch(request).await?;
        Ok(payload.into_addresses())
    }

    #[instrument(skip(self, token), fields(address_id = %id))]
    async fn delete_address(&self, token: &SecretString, id: &AddressId) -> Result<()> {
        let path = format!("users/deleteAddress/{}", urlencoding::encode(id.as_str()));
        self.send(self.authed(Method::DELETE, &path, token)?).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(address_id = %address_id))]
    async fn checkout(&self, token: &SecretString, address_id: &AddressId) -> Result<()> {
        let request = self
            .authed(Method::POST, "cart/checkout", token)?
            .json(&CheckoutRequest {
                address_id: address_id.as_str(),
            });
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, password), fields(username = %username))]
    async fn login(&self, username: &Username, password: &Password) -> Result<LoginResponse> {
        let request = self
            .request(Method::POST, "auth/login")?
            .json(&LoginRequest {
                username: username.as_str(),
                password: password.expose(),
            });
        self.fetch(request).await
    }

    #[instrument(skip(self, email, password), fields(username = %username))]
    async fn register(
        &self,
        username: &Username,
        email: &Email,
        password: &Password,
    ) -> Result<()> {
        let request = self
            .request(Method::POST, "auth/register")?
            .json(&RegisterRequest {
                name: username.as_str(),
                email: email.as_str(),
                password: password.expose(),
            });
        self.send(request).await?;
        Ok(())
    }
}

/// The message to surface for a rejected request.
///
/// Uses the backend's `message` verbatim when the body carries one, and the
/// HTTP status text otherwise.
fn rejection_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), str::to_string)
        })
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
