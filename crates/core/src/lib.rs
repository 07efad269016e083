//! Kartwheel Core - Shared types and cart rules.
//!
//! This crate provides the types and pure domain logic used by every
//! Kartwheel component:
//! - `storefront` - Backend client, session, and cart/checkout services
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session storage. Everything here is deterministic and can be
//! tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, products, cart line items, addresses, credentials
//! - [`reconcile`] - Merging the remote cart with the catalog, totals
//! - [`checkout`] - Checkout preconditions and order charge

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod reconcile;
pub mod types;

pub use checkout::{CheckoutBlocker, PreparedOrder, can_checkout, prepare_order};
pub use reconcile::{OrderSummary, Reconciliation, item_count, reconcile, total_value};
pub use types::*;
