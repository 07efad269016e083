//! Product listing.

use kartwheel_core::Product;
use kartwheel_storefront::{Storefront, StorefrontError};

/// List every product, or those matching `search`.
pub async fn products(storefront: &Storefront, search: Option<&str>) -> Result<(), StorefrontError> {
    let products = match search {
        Some(query) => storefront.search_products(query).await?,
        None => storefront.products().await?,
    };
    print_products(&products);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        let cost = product.cost.to_string();
        println!(
            "{:<20} {cost:>8}  {}/5  {} ({})",
            product.id,
            product.stars(),
            product.name,
            product.category
        );
    }
}
