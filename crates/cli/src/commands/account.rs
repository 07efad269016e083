//! Login, registration and the current session.

use kartwheel_storefront::{Storefront, StorefrontError};

pub async fn login(storefront: &Storefront, username: &str, password: &str) -> Result<(), StorefrontError> {
    let session = storefront.login(username, password).await?;
    print_line(&format!(
        "Logged in as {} (wallet {})",
        session.username(),
        session.balance()
    ));
    Ok(())
}

pub async fn register(
    storefront: &Storefront,
    username: &str,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<(), StorefrontError> {
    storefront.register(username, email, password, confirm).await?;
    print_line(&format!("Account {username} created. Log in to start shopping."));
    Ok(())
}

pub async fn logout(storefront: &Storefront) -> Result<(), StorefrontError> {
    storefront.logout().await?;
    print_line("Logged out");
    Ok(())
}

/// Show the stored session without touching the backend.
pub fn whoami(storefront: &Storefront) -> Result<(), StorefrontError> {
    match storefront.restore()? {
        Some(session) => print_line(&format!(
            "{} (wallet {})",
            session.username(),
            session.balance()
        )),
        None => print_line("Not logged in"),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}
