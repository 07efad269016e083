//! In-memory backend for unit tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use kartwheel_core::{
    Address, AddressId, AddressText, CartLineItem, Email, Money, Password, Product, ProductId,
    Username,
};
use secrecy::SecretString;

use crate::api::{LoginResponse, StoreBackend};
use crate::error::{Result, StorefrontError};

#[derive(Default)]
struct State {
    products: Vec<Product>,
    cart: Vec<CartLineItem>,
    addresses: Vec<Address>,
    users: HashMap<String, (String, Money)>,
    next_address: u32,
    failure: Option<(u16, String)>,
    offline: bool,
    call_failures: HashMap<&'static str, (u16, String)>,
    search_delays: HashMap<String, Duration>,
    call_delays: HashMap<&'static str, Duration>,
    calls: Vec<&'static str>,
}

/// A backend that keeps everything in memory and records every call.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

pub fn product(id: &str, cost: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        category: "Fashion".to_string(),
        cost: Money::from_units(cost),
        rating: 4,
        image_url: format!("https://img.example/{id}.png"),
    }
}

pub fn address(id: &str) -> Address {
    Address {
        id: AddressId::new(id),
        text: format!("House {id}, Kolam lane, Chennai 600001"),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog `[p1 cost 100, p2 cost 50, p3 cost 25]`.
    pub fn with_catalog() -> Self {
        Self::new().with_products(vec![product("p1", 100), product("p2", 50), product("p3", 25)])
    }

    pub fn with_products(self, products: Vec<Product>) -> Self {
        self.lock().products = products;
        self
    }

    pub fn with_cart(self, lines: Vec<CartLineItem>) -> Self {
        self.lock().cart = lines;
        self
    }

    pub fn with_addresses(self, addresses: Vec<Address>) -> Self {
        self.lock().addresses = addresses;
        self
    }

    pub fn with_user(self, username: &str, password: &str, balance: i64) -> Self {
        self.lock().users.insert(
            username.to_string(),
            (password.to_string(), Money::from_units(balance)),
        );
        self
    }

    /// Delay answers to searches for exactly `query`.
    pub fn with_search_delay(self, query: &str, delay: Duration) -> Self {
        self.lock().search_delays.insert(query.to_string(), delay);
        self
    }

    /// Hold every call to `call` for `delay` before it reaches the backend.
    pub fn delay_call(&self, call: &'static str, delay: Duration) {
        self.lock().call_delays.insert(call, delay);
    }

    /// Reject every call from now on.
    pub fn fail_with(&self, status: u16, message: &str) {
        self.lock().failure = Some((status, message.to_string()));
    }

    /// Reject only calls to `call` from now on.
    pub fn fail_call(&self, call: &'static str, status: u16, message: &str) {
        self.lock()
            .call_failures
            .insert(call, (status, message.to_string()));
    }

    /// Fail every call from now on as if the backend were down.
    pub fn go_offline(&self) {
        self.lock().offline = true;
    }

    pub fn recover(&self) {
        let mut state = self.lock();
        state.failure = None;
        state.offline = false;
        state.call_failures.clear();
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == name).count()
    }

    pub fn remote_cart(&self) -> Vec<CartLineItem> {
        self.lock().cart.clone()
    }

    pub fn remote_addresses(&self) -> Vec<Address> {
        self.lock().addresses.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self, call: &'static str) {
        let delay = self.lock().call_delays.get(call).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn begin(&self, call: &'static str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.offline {
            return Err(StorefrontError::BackendUnreachable(
                "connection refused".to_string(),
            ));
        }
        if let Some((status, message)) = state
            .call_failures
            .get(call)
            .cloned()
            .or_else(|| state.failure.clone())
        {
            return Err(StorefrontError::BackendRejected { status, message });
        }
        Ok(state)
    }
}

#[async_trait]
impl StoreBackend for FakeBackend {
    async fn products(&self) -> Result<Vec<Product>> {
        Ok(self.begin("products")?.products.clone())
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let (delay, matches) = {
            let state = self.begin("search_products")?;
            let needle = query.to_lowercase();
            let matches: Vec<Product> = state
                .products
                .iter()
                .filter(|p| {
                    p.name.to_lowercase().contains(&needle)
                        || p.category.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect();
            (state.search_delays.get(query).copied(), matches)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(matches)
    }

    async fn cart(&self, _token: &SecretString) -> Result<Vec<CartLineItem>> {
        Ok(self.begin("cart")?.cart.clone())
    }

    async fn upsert_cart_item(&self, _token: &SecretString, item: &CartLineItem) -> Result<()> {
        let mut state = self.begin("upsert_cart_item")?;
        if item.quantity <= 0 {
            state.cart.retain(|line| line.product_id != item.product_id);
        } else if let Some(line) = state
            .cart
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            line.quantity = item.quantity;
        } else {
            state.cart.push(item.clone());
        }
        Ok(())
    }

    async fn addresses(&self, _token: &SecretString) -> Result<Vec<Address>> {
        Ok(self.begin("addresses")?.addresses.clone())
    }

    async fn add_address(
        &self,
        _token: &SecretString,
        text: &AddressText,
    ) -> Result<Vec<Address>> {
        let mut state = self.begin("add_address")?;
        state.next_address += 1;
        let id = AddressId::new(format!("new-{}", state.next_address));
        state.addresses.push(Address {
            id,
            text: text.as_str().to_string(),
        });
        Ok(state.addresses.clone())
    }

    async fn delete_address(&self, _token: &SecretString, id: &AddressId) -> Result<()> {
        let mut state = self.begin("delete_address")?;
        state.addresses.retain(|a| &a.id != id);
        Ok(())
    }

    async fn checkout(&self, _token: &SecretString, _address_id: &AddressId) -> Result<()> {
        self.pause("checkout").await;
        self.begin("checkout")?.cart.clear();
        Ok(())
    }

    async fn login(&self, username: &Username, password: &Password) -> Result<LoginResponse> {
        let state = self.begin("login")?;
        match state.users.get(username.as_str()) {
            Some((expected, balance)) if expected == password.expose() => Ok(LoginResponse {
                token: format!("token-{username}"),
                username: username.to_string(),
                balance: *balance,
            }),
            Some(_) => Err(StorefrontError::BackendRejected {
                status: 400,
                message: "Password is incorrect".to_string(),
            }),
            None => Err(StorefrontError::BackendRejected {
                status: 400,
                message: "Username does not exist".to_string(),
            }),
        }
    }

    async fn register(&self, username: &Username, _email: &Email, password: &Password) -> Result<()> {
        let mut state = self.begin("register")?;
        if state.users.contains_key(username.as_str()) {
            return Err(StorefrontError::BackendRejected {
                status: 400,
                message: "Username is already taken".to_string(),
            });
        }
        state.users.insert(
            username.to_string(),
            (password.expose().to_string(), Money::from_units(5000)),
        );
        Ok(())
    }
}
