//! Kartwheel CLI - a command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! kartwheel products
//! kartwheel products --search fashion
//!
//! # Log in; the session is kept in STOREFRONT_SESSION_FILE between runs
//! kartwheel login -u crio.do -p learnwithcrio
//!
//! # Fill the cart and check out to the second saved address
//! kartwheel cart add BW0jAAeDJmlZCF8i -q 2
//! kartwheel address add "12th street, Andheri East, Mumbai 400069"
//! kartwheel checkout --address 2
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_API_URL` - Backend base URL (required)
//! - `SENTRY_DSN` - Enables error reporting when set
//! - `RUST_LOG` - Log filter (default `kartwheel_storefront=info,kartwheel_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use kartwheel_storefront::notify::TracingNotifier;
use kartwheel_storefront::{FileStore, Storefront, StorefrontConfig};
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "kartwheel")]
#[command(author, version, about = "Kartwheel command-line storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products, optionally filtered by a search query
    Products {
        /// Search by name or category
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Log in and keep the session for later commands
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Repeat the password
        #[arg(short, long)]
        confirm: String,
    },
    /// Log out and forget the stored session
    Logout,
    /// Show the logged-in user and wallet balance
    Whoami,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Manage saved shipping addresses
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Place an order for everything in the cart
    Checkout {
        /// Shipping address number, as shown by `address list`
        #[arg(short, long)]
        address: usize,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and its total
    Show,
    /// Add a product that is not in the cart yet
    Add {
        product_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set { product_id: String, quantity: u32 },
    /// Add one more of a product
    Inc { product_id: String },
    /// Take one away; the last one removes the line
    Dec { product_id: String },
    /// Remove a product from the cart
    Remove { product_id: String },
}

#[derive(Subcommand)]
enum AddressAction {
    /// List saved addresses
    List,
    /// Save a new address (at least 20 characters)
    Add { text: String },
    /// Delete an address by its number
    Delete { number: usize },
    /// Check whether the cart can be shipped to an address
    Select { number: usize },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.expose_secret(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match StorefrontConfig::from_env() {
        Ok(config) => {
            // Sentry must be initialized before the tracing subscriber
            let _sentry_guard = init_sentry(&config);
            init_tracing();
            run(cli, config).await
        }
        Err(e) => {
            init_tracing();
            Err(e.into())
        }
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kartwheel_storefront=info,kartwheel_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::new(&config.session_file);
    let storefront = Storefront::new(config, Box::new(store), Arc::new(TracingNotifier));

    match cli.command {
        Commands::Products { search } => {
            commands::catalog::products(&storefront, search.as_deref()).await?;
        }
        Commands::Login { username, password } => {
            commands::account::login(&storefront, &username, &password).await?;
        }
        Commands::Register {
            username,
            email,
            password,
            confirm,
        } => {
            commands::account::register(&storefront, &username, &email, &password, &confirm)
                .await?;
        }
        Commands::Logout => commands::account::logout(&storefront).await?,
        Commands::Whoami => commands::account::whoami(&storefront)?,
        Commands::Cart { action } => {
            commands::require_session(&storefront).await?;
            match action.unwrap_or(CartAction::Show) {
                CartAction::Show => {}
                CartAction::Add {
                    product_id,
                    quantity,
                } => commands::cart::add(&storefront, &product_id, quantity).await?,
                CartAction::Set {
                    product_id,
                    quantity,
                } => commands::cart::set(&storefront, &product_id, quantity).await?,
                CartAction::Inc { product_id } => {
                    commands::cart::increment(&storefront, &product_id).await?;
                }
                CartAction::Dec { product_id } => {
                    commands::cart::decrement(&storefront, &product_id).await?;
                }
                CartAction::Remove { product_id } => {
                    commands::cart::remove(&storefront, &product_id).await?;
                }
            }
            commands::cart::show(&storefront).await;
        }
        Commands::Address { action } => {
            commands::require_session(&storefront).await?;
            match action {
                AddressAction::List => {}
                AddressAction::Add { text } => {
                    commands::address::add(&storefront, &text).await?;
                }
                AddressAction::Delete { number } => {
                    commands::address::delete(&storefront, number).await?;
                }
                AddressAction::Select { number } => {
                    commands::address::select(&storefront, number).await?;
                }
            }
            commands::address::list(&storefront).await;
        }
        Commands::Checkout { address } => {
            commands::require_session(&storefront).await?;
            commands::checkout::checkout(&storefront, address).await?;
        }
    }
    Ok(())
}
