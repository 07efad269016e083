//! Core types for Kartwheel.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod cart;
pub mod credentials;
pub mod email;
pub mod id;
pub mod money;
pub mod product;

pub use address::{Address, AddressError, AddressSelection, AddressText};
pub use cart::{CartLineItem, EnrichedCartItem};
pub use credentials::{CredentialError, Password, Username};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use product::Product;
