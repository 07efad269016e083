//! Kartwheel storefront library.
//!
//! Everything a front end needs to browse the catalog, keep a cart in step
//! with the backend, manage shipping addresses and check out. Start with
//! [`Storefront`]; the individual services are public for front ends that
//! want finer control.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address_book;
pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod notify;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::StorefrontConfig;
pub use error::{Result, StorefrontError};
pub use notify::{Notice, Notifier, Severity};
pub use session::{FileStore, MemoryStore, Session, SessionStore};
pub use state::Storefront;
