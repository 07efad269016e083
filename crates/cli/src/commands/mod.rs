//! Subcommand implementations.
//!
//! Failures are already reported through the storefront's notifier, so
//! commands only print what succeeded.

pub mod account;
pub mod address;
pub mod cart;
pub mod catalog;
pub mod checkout;

use kartwheel_storefront::{Session, Storefront, StorefrontError};

/// Restore the stored session and load its cart and addresses.
pub async fn require_session(storefront: &Storefront) -> Result<Session, StorefrontError> {
    storefront
        .start()
        .await?
        .ok_or(StorefrontError::NotAuthenticated)
}

/// Convert a 1-based address number from the command line to an index.
fn address_index(number: usize) -> Result<usize, StorefrontError> {
    number
        .checked_sub(1)
        .ok_or_else(|| StorefrontError::AddressNotFound(format!("#{number}")))
}
