//! Cart subcommands.

use kartwheel_core::ProductId;
use kartwheel_storefront::{Storefront, StorefrontError};

pub async fn add(storefront: &Storefront, product_id: &str, quantity: u32) -> Result<(), StorefrontError> {
    storefront
        .add_to_cart(&ProductId::new(product_id), quantity)
        .await?;
    Ok(())
}

pub async fn set(storefront: &Storefront, product_id: &str, quantity: u32) -> Result<(), StorefrontError> {
    storefront
        .set_quantity(&ProductId::new(product_id), quantity)
        .await?;
    Ok(())
}

pub async fn increment(storefront: &Storefront, product_id: &str) -> Result<(), StorefrontError> {
    storefront.increment(&ProductId::new(product_id)).await?;
    Ok(())
}

pub async fn decrement(storefront: &Storefront, product_id: &str) -> Result<(), StorefrontError> {
    storefront.decrement(&ProductId::new(product_id)).await?;
    Ok(())
}

pub async fn remove(storefront: &Storefront, product_id: &str) -> Result<(), StorefrontError> {
    storefront
        .remove_from_cart(&ProductId::new(product_id))
        .await?;
    Ok(())
}

/// Print every line and the order summary.
#[allow(clippy::print_stdout)]
pub async fn show(storefront: &Storefront) {
    let items = storefront.cart().items().await;
    if items.is_empty() {
        println!("Cart is empty");
        return;
    }

    for item in &items {
        let cost = item.product().cost.to_string();
        let line_total = item.line_total().to_string();
        println!(
            "{:<20} {:>3} x {cost:>8} = {line_total:>9}  {}",
            item.product_id(),
            item.quantity(),
            item.product().name
        );
    }

    let summary = storefront.summary().await;
    println!();
    println!("Products  {}", summary.products);
    println!("Subtotal  {}", summary.subtotal);
    println!("Shipping  {}", summary.shipping);
    println!("Total     {}", summary.total);
}
