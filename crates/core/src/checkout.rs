//! Checkout preconditions and order pricing.
//!
//! Checks run in a fixed order and the first failure wins: an empty cart,
//! then a balance that does not cover the total, then a missing address.

use crate::reconcile::total_value;
use crate::types::{AddressId, EnrichedCartItem, Money};

/// Reasons checkout is not allowed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutBlocker {
    #[error("cart is empty")]
    EmptyCart,
    #[error("insufficient balance: order total is {required}, wallet has {available}")]
    InsufficientBalance { required: Money, available: Money },
    #[error("no shipping address selected")]
    NoAddressSelected,
}

/// Check whether the cart may be checked out.
///
/// # Errors
///
/// Returns the first [`CheckoutBlocker`] that applies.
pub fn can_checkout(
    cart: &[EnrichedCartItem],
    address: Option<&AddressId>,
    balance: Money,
) -> Result<(), CheckoutBlocker> {
    if cart.is_empty() {
        return Err(CheckoutBlocker::EmptyCart);
    }

    let required = total_value(cart);
    if required > balance {
        return Err(CheckoutBlocker::InsufficientBalance {
            required,
            available: balance,
        });
    }

    if address.is_none() {
        return Err(CheckoutBlocker::NoAddressSelected);
    }

    Ok(())
}

/// An order that passed every checkout check and is ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedOrder {
    pub address_id: AddressId,
    pub total: Money,
    /// Balance once the order is charged. Never negative.
    pub new_balance: Money,
}

/// Validate the cart and price the order.
///
/// # Errors
///
/// Returns the first [`CheckoutBlocker`] that applies.
pub fn prepare_order(
    cart: &[EnrichedCartItem],
    address: Option<&AddressId>,
    balance: Money,
) -> Result<PreparedOrder, CheckoutBlocker> {
    can_checkout(cart, address, balance)?;
    let address_id = address.cloned().ok_or(CheckoutBlocker::NoAddressSelected)?;

    let total = total_value(cart);
    Ok(PreparedOrder {
        address_id,
        total,
        new_balance: balance - total,
    })
}
