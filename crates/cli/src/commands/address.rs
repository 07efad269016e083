//! Address subcommands.
//!
//! Addresses are numbered from 1 in the order the backend returns them.

use kartwheel_storefront::{Storefront, StorefrontError};

use super::address_index;

pub async fn add(storefront: &Storefront, text: &str) -> Result<(), StorefrontError> {
    storefront.add_address(text).await?;
    Ok(())
}

pub async fn delete(storefront: &Storefront, number: usize) -> Result<(), StorefrontError> {
    storefront.delete_address(address_index(number)?).await?;
    Ok(())
}

/// Select an address and report whether the cart could ship there now.
///
/// The selection lasts for this process only; pass `--address` to
/// `checkout` to use it for an order.
pub async fn select(storefront: &Storefront, number: usize) -> Result<(), StorefrontError> {
    storefront.select_address(address_index(number)?).await?;
    match storefront.can_checkout().await {
        Ok(()) => print_line("Ready to check out to this address"),
        Err(e) => print_line(&e.user_message()),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn list(storefront: &Storefront) {
    let addresses = storefront.address_book().addresses().await;
    if addresses.is_empty() {
        println!("No addresses found for this account. Please add one to proceed");
        return;
    }

    let selected = storefront.address_book().selected().await.map(|a| a.id);
    for (number, address) in addresses.iter().enumerate() {
        let marker = if selected.as_ref() == Some(&address.id) { '*' } else { ' ' };
        println!("{marker} {:>2}. {}", number + 1, address.text);
    }
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}
