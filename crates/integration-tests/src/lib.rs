//! Integration tests for Kartwheel.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kartwheel-integration-tests
//! ```
//!
//! No external services are needed. [`MockBackend`] serves the store REST
//! API from memory on an ephemeral port, and the tests drive the real
//! `ApiClient` and `Storefront` against it over HTTP.
//!
//! # Test Categories
//!
//! - `api_client` - Wire format, auth headers and error mapping
//! - `storefront` - Login, cart, address and checkout flows end to end

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use kartwheel_core::{Address, AddressId, CartLineItem, Money, Product, ProductId};
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Path prefix the mock serves the API under.
pub const API_PREFIX: &str = "/api/v1";

/// A shopper account on the mock backend.
#[derive(Debug, Clone)]
pub struct Account {
    pub password: String,
    pub email: String,
    pub balance: Money,
    pub cart: Vec<CartLineItem>,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Default)]
struct MockState {
    products: Vec<Product>,
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>,
    next_address: u32,
    requests: Vec<String>,
}

/// In-memory store backend serving the REST API over HTTP.
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    base_url: Url,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBackend {
    /// Serve `products` on an ephemeral local port.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start(products: Vec<Product>) -> std::io::Result<Self> {
        let state: Shared = Arc::new(Mutex::new(MockState {
            products,
            ..MockState::default()
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}{API_PREFIX}/"))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { state, base_url })
    }

    /// Base URL for `ApiClient`, ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Create an account directly, bypassing registration.
    pub fn add_account(&self, username: &str, password: &str, balance: i64) {
        lock(&self.state).accounts.insert(
            username.to_string(),
            Account {
                password: password.to_string(),
                email: format!("{username}@example.com"),
                balance: Money::from_units(balance),
                cart: Vec::new(),
                addresses: Vec::new(),
            },
        );
    }

    /// Replace an account's remote cart, raw, as another device might.
    pub fn set_cart(&self, username: &str, lines: Vec<CartLineItem>) {
        if let Some(account) = lock(&self.state).accounts.get_mut(username) {
            account.cart = lines;
        }
    }

    /// Save an address for an account and return its ID.
    pub fn add_address(&self, username: &str, text: &str) -> Option<AddressId> {
        let mut state = lock(&self.state);
        let id = next_address_id(&mut state);
        let account = state.accounts.get_mut(username)?;
        account.addresses.push(Address {
            id: id.clone(),
            text: text.to_string(),
        });
        Some(id)
    }

    /// A snapshot of an account.
    #[must_use]
    pub fn account(&self, username: &str) -> Option<Account> {
        lock(&self.state).accounts.get(username).cloned()
    }

    /// Every request served so far, as `"METHOD /path"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }
}

fn next_address_id(state: &mut MockState) -> AddressId {
    state.next_address += 1;
    AddressId::new(format!("addr-{}", state.next_address))
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/products", get(list_products))
        .route("/products/search", get(search_products))
        .route("/cart", get(get_cart).put(put_cart))
        .route("/cart/checkout", post(checkout))
        .route("/users/getAddress", get(get_addresses))
        .route("/users/addAddress", post(add_address))
        .route("/users/deleteAddress/{id}", delete(delete_address))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(axum::middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(
    State(state): State<Shared>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    lock(&state).requests.push(line);
    next.run(request).await
}

// =============================================================================
// Responses
// =============================================================================

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn unauthorized() -> Response {
    fail(StatusCode::UNAUTHORIZED, "Protected route, Oauth2 Bearer token not found")
}

/// Username behind the request's bearer token.
fn caller(state: &MockState, headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    state.tokens.get(token).cloned()
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(State(state): State<Shared>) -> Response {
    Json(lock(&state).products.clone()).into_response()
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    value: String,
}

async fn search_products(
    State(state): State<Shared>,
    Query(params): Query<SearchParams>,
) -> Response {
    let needle = params.value.to_lowercase();
    let matches: Vec<Product> = lock(&state)
        .products
        .iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle) || p.category.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    if matches.is_empty() {
        return fail(StatusCode::NOT_FOUND, "No products found");
    }
    Json(matches).into_response()
}

// =============================================================================
// Cart
// =============================================================================

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(account) = caller(&state, &headers).and_then(|u| state.accounts.get(&u)) else {
        return unauthorized();
    };
    Json(json!({ "cartItems": account.cart })).into_response()
}

async fn put_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(line): Json<CartLineItem>,
) -> Response {
    let mut state = lock(&state);
    let Some(username) = caller(&state, &headers) else {
        return unauthorized();
    };
    if !state.products.iter().any(|p| p.id == line.product_id) {
        return fail(StatusCode::NOT_FOUND, "Product doesn't exist");
    }
    let Some(account) = state.accounts.get_mut(&username) else {
        return unauthorized();
    };

    if line.quantity <= 0 {
        account.cart.retain(|l| l.product_id != line.product_id);
    } else if let Some(existing) = account
        .cart
        .iter_mut()
        .find(|l| l.product_id == line.product_id)
    {
        existing.quantity = line.quantity;
    } else {
        account.cart.push(line);
    }
    Json(account.cart.clone()).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBody {
    address_id: String,
}

async fn checkout(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> Response {
    let mut state = lock(&state);
    let Some(username) = caller(&state, &headers) else {
        return unauthorized();
    };
    let prices: HashMap<ProductId, Money> = state
        .products
        .iter()
        .map(|p| (p.id.clone(), p.cost))
        .collect();
    let Some(account) = state.accounts.get_mut(&username) else {
        return unauthorized();
    };

    if account.cart.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Cart is empty");
    }
    if !account.addresses.iter().any(|a| a.id.as_str() == body.address_id) {
        return fail(StatusCode::BAD_REQUEST, "Bad address specified");
    }

    let total: Money = account
        .cart
        .iter()
        .filter_map(|line| {
            let price = prices.get(&line.product_id)?;
            let quantity = u32::try_from(line.quantity).ok()?;
            Some(price.times(quantity))
        })
        .sum();
    if account.balance < total {
        return fail(
            StatusCode::BAD_REQUEST,
            "Wallet balance not sufficient to place order",
        );
    }

    account.balance = account.balance - total;
    account.cart.clear();
    Json(json!({ "success": true })).into_response()
}

// =============================================================================
// Addresses
// =============================================================================

async fn get_addresses(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(account) = caller(&state, &headers).and_then(|u| state.accounts.get(&u)) else {
        return unauthorized();
    };
    Json(account.addresses.clone()).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddAddressBody {
    new_address: String,
}

async fn add_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<AddAddressBody>,
) -> Response {
    let mut state = lock(&state);
    let Some(username) = caller(&state, &headers) else {
        return unauthorized();
    };
    let id = next_address_id(&mut state);
    let Some(account) = state.accounts.get_mut(&username) else {
        return unauthorized();
    };

    account.addresses.push(Address {
        id,
        text: body.new_address,
    });
    Json(account.addresses.clone()).into_response()
}

async fn delete_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut state = lock(&state);
    let Some(username) = caller(&state, &headers) else {
        return unauthorized();
    };
    let Some(account) = state.accounts.get_mut(&username) else {
        return unauthorized();
    };

    let before = account.addresses.len();
    account.addresses.retain(|a| a.id.as_str() != id);
    if account.addresses.len() == before {
        return fail(StatusCode::NOT_FOUND, "Address to delete was not found");
    }
    Json(account.addresses.clone()).into_response()
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let mut state = lock(&state);
    let Some(account) = state.accounts.get(&body.username) else {
        return fail(StatusCode::BAD_REQUEST, "Username does not exist");
    };
    if account.password != body.password {
        return fail(StatusCode::BAD_REQUEST, "Password is incorrect");
    }

    let balance = account.balance;
    let token = format!("token-{}-{}", body.username, state.tokens.len() + 1);
    state.tokens.insert(token.clone(), body.username.clone());
    Json(json!({
        "success": true,
        "token": token,
        "username": body.username,
        "balance": balance,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
}

async fn register(State(state): State<Shared>, Json(body): Json<RegisterBody>) -> Response {
    let mut state = lock(&state);
    if state.accounts.contains_key(&body.name) {
        return fail(StatusCode::BAD_REQUEST, "Username is already taken");
    }
    state.accounts.insert(
        body.name,
        Account {
            password: body.password,
            email: body.email,
            balance: Money::from_units(5000),
            cart: Vec::new(),
            addresses: Vec::new(),
        },
    );
    (StatusCode::CREATED, Json(json!({ "success": true }))).into_response()
}

/// The catalog most tests shop from.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    [
        ("BW0jAAeDJmlZCF8i", "Tan Leatherette Weekender Duffle", "Fashion", 150),
        ("KCRwjF7lN97HnEaY", "Black Round Dial Analog Watch", "Fashion", 100),
        ("upLK9JbQ4rMhTwt4", "YONEX Smash Badminton Racquet", "Sports", 100),
        ("a4sLtEcMpzabRyfx", "Qube Leather Slip-On Sneakers", "Fashion", 25),
    ]
    .into_iter()
    .map(|(id, name, category, cost)| Product {
        id: ProductId::new(id),
        name: name.to_string(),
        category: category.to_string(),
        cost: Money::from_units(cost),
        rating: 4,
        image_url: format!("https://img.example/{id}.png"),
    })
    .collect()
}
