//! Checkout subcommand.

use kartwheel_storefront::{Storefront, StorefrontError};

use super::address_index;

/// Ship the cart to address `number` and charge the wallet.
#[allow(clippy::print_stdout)]
pub async fn checkout(storefront: &Storefront, number: usize) -> Result<(), StorefrontError> {
    storefront.select_address(address_index(number)?).await?;
    let receipt = storefront.checkout().await?;

    println!("Order placed for {}", receipt.total_cost);
    println!("Wallet balance is now {}", receipt.new_balance);
    Ok(())
}
