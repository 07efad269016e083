//! Wire types for the store backend's REST API.
//!
//! The backend has shipped several response shapes over time; decoding
//! accepts all of them and normalizes to the core types.

use kartwheel_core::{Address, CartLineItem, Money, ProductId};
use serde::{Deserialize, Serialize};

/// Successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub balance: Money,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AddAddressRequest<'a> {
    #[serde(rename = "newAddress")]
    pub new_address: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CheckoutRequest<'a> {
    #[serde(rename = "addressId")]
    pub address_id: &'a str,
}

/// Cart as returned by `GET /cart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CartPayload {
    Lines(Vec<CartEntry>),
    Wrapped {
        #[serde(rename = "cartItems", alias = "items")]
        cart_items: Vec<CartEntry>,
    },
}

impl CartPayload {
    /// Normalize to line items, keeping backend order.
    #[must_use]
    pub fn into_line_items(self) -> Vec<CartLineItem> {
        let entries = match self {
            Self::Lines(entries) | Self::Wrapped { cart_items: entries } => entries,
        };
        entries.into_iter().map(CartEntry::into_line_item).collect()
    }
}

/// One cart entry in any of the backend's shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CartEntry {
    Line(CartLineItem),
    Nested {
        product: ProductRef,
        #[serde(alias = "qty")]
        quantity: i64,
    },
}

impl CartEntry {
    fn into_line_item(self) -> CartLineItem {
        match self {
            Self::Line(line) => line,
            Self::Nested { product, quantity } => CartLineItem {
                product_id: product.id,
                quantity,
            },
        }
    }
}

/// Product reference inside a nested cart entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRef {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
}

/// Address list as returned by the address endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AddressPayload {
    List(Vec<Address>),
    Wrapped {
        #[serde(alias = "addresses")]
        address: Vec<Address>,
    },
}

impl AddressPayload {
    #[must_use]
    pub fn into_addresses(self) -> Vec<Address> {
        match self {
            Self::List(addresses) | Self::Wrapped { address: addresses } => addresses,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_bare_list() {
        let json = r#"[{"productId": "p1", "qty": 2}, {"productId": "p2", "quantity": 0}]"#;
        let lines = serde_json::from_str::<CartPayload>(json)
            .unwrap()
            .into_line_items();
        assert_eq!(
            lines,
            vec![CartLineItem::new("p1", 2), CartLineItem::new("p2", 0)]
        );
    }

    #[test]
    fn test_cart_wrapped_nested_products() {
        let json = r#"{
            "cartItems": [
                {"product": {"_id": "BW0jAAeDJmlZCF8i", "name": "Duffle", "cost": 150}, "quantity": 1},
                {"productId": "KCRwjF7lN97HnEaY", "quantity": 3}
            ]
        }"#;
        let lines = serde_json::from_str::<CartPayload>(json)
            .unwrap()
            .into_line_items();
        assert_eq!(
            lines,
            vec![
                CartLineItem::new("BW0jAAeDJmlZCF8i", 1),
                CartLineItem::new("KCRwjF7lN97HnEaY", 3),
            ]
        );
    }

    #[test]
    fn test_addresses_wrapped_and_bare() {
        let wrapped = r#"{"address": [{"_id": "a1", "address": "Kolam lane, Chennai 600001"}]}"#;
        let bare = r#"[{"_id": "a1", "address": "Kolam lane, Chennai 600001"}]"#;

        let a = serde_json::from_str::<AddressPayload>(wrapped)
            .unwrap()
            .into_addresses();
        let b = serde_json::from_str::<AddressPayload>(bare)
            .unwrap()
            .into_addresses();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_login_response() {
        let json = r#"{"success": true, "token": "tok", "username": "crio.do", "balance": 5000}"#;
        let response: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.balance, Money::from_units(5000));
        assert_eq!(response.username, "crio.do");
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(AddAddressRequest {
            new_address: "Kolam lane, Chennai 600001",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"newAddress": "Kolam lane, Chennai 600001"})
        );

        let body = serde_json::to_value(CheckoutRequest { address_id: "a1" }).unwrap();
        assert_eq!(body, serde_json::json!({"addressId": "a1"}));
    }
}
