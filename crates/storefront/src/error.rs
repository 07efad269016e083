//! Storefront error taxonomy with Sentry integration.
//!
//! Every operation returns [`Result<T>`]. Each error knows how loudly it
//! should be shown ([`StorefrontError::severity`]) and what the user should
//! read ([`StorefrontError::user_message`]). Local validation errors are
//! raised before any network call and never change state.

use kartwheel_core::{AddressError, CheckoutBlocker, CredentialError, EmailError, ProductId};
use thiserror::Error;

use crate::notify::Severity;
use crate::session::StoreError;

const BACKEND_UNREACHABLE: &str =
    "Something went wrong. Check that the backend is running, reachable and returns valid JSON.";

/// Errors raised by storefront operations.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// The operation needs a logged-in session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The product already has a line in the cart.
    #[error("product {0} is already in the cart")]
    DuplicateItem(ProductId),

    /// The product is not in the catalog.
    #[error("product {0} is not in the catalog")]
    UnknownProduct(ProductId),

    /// The product has no line in the cart.
    #[error("product {0} is not in the cart")]
    ItemNotInCart(ProductId),

    /// A new cart line needs a quantity of at least one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Checkout preconditions failed.
    #[error("checkout blocked: {0}")]
    Checkout(#[from] CheckoutBlocker),

    /// New address text failed validation.
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    /// No saved address matches the given index or ID.
    #[error("address not found: {0}")]
    AddressNotFound(String),

    /// Login or registration input failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The backend could not be reached.
    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    /// The backend answered with a non-success status.
    #[error("backend rejected request ({status}): {message}")]
    BackendRejected { status: u16, message: String },

    /// The backend answered with a body we could not decode.
    #[error("unexpected response from backend: {0}")]
    Decode(String),

    /// The session store failed.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

impl StorefrontError {
    /// Whether this is a local validation problem rather than a failure.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated
                | Self::DuplicateItem(_)
                | Self::UnknownProduct(_)
                | Self::ItemNotInCart(_)
                | Self::InvalidQuantity
                | Self::Address(_)
                | Self::AddressNotFound(_)
                | Self::InvalidInput(_)
        )
    }

    /// Severity to show this error with.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        if self.is_warning() {
            Severity::Warning
        } else {
            Severity::Error
        }
    }

    /// Whether the failure happened on the backend or on the way to it.
    #[must_use]
    pub const fn is_backend(&self) -> bool {
        matches!(
            self,
            Self::BackendUnreachable(_) | Self::BackendRejected { .. } | Self::Decode(_)
        )
    }

    /// Message shown to the user.
    ///
    /// Backend rejections carry the backend's own message verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Login required".to_string(),
            Self::DuplicateItem(_) => {
                "Item already in cart. Use the cart sidebar to update quantity or remove item."
                    .to_string()
            }
            Self::UnknownProduct(_) => "This product is no longer available".to_string(),
            Self::ItemNotInCart(_) => "This item is not in your cart".to_string(),
            Self::InvalidQuantity => "Quantity must be at least 1".to_string(),
            Self::Checkout(CheckoutBlocker::EmptyCart) => {
                "Please add at least one item to checkout".to_string()
            }
            Self::Checkout(CheckoutBlocker::InsufficientBalance { .. }) => {
                "You do not have enough balance in your wallet for this purchase".to_string()
            }
            Self::Checkout(CheckoutBlocker::NoAddressSelected) => {
                "Please select one shipping address to proceed.".to_string()
            }
            Self::Address(AddressError::TooShort { .. }) => {
                "Please enter your full address.".to_string()
            }
            Self::AddressNotFound(_) => "That address no longer exists".to_string(),
            Self::InvalidInput(message) | Self::BackendRejected { message, .. } => message.clone(),
            Self::BackendUnreachable(_) | Self::Decode(_) => BACKEND_UNREACHABLE.to_string(),
            Self::Store(_) => "Could not save your session".to_string(),
        }
    }
}

impl From<reqwest::Error> for StorefrontError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        Self::BackendUnreachable(err.to_string())
    }
}

impl From<serde_json::Error> for StorefrontError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<CredentialError> for StorefrontError {
    fn from(err: CredentialError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<EmailError> for StorefrontError {
    fn from(err: EmailError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context to the logged-in username.
///
/// Call this after a successful login to associate errors with the shopper.
pub fn set_sentry_user(username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the shopper.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", &[("product_id", "BW0jAAeDJmlZCF8i")]);
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

/// Report a failure to Sentry and the log.
///
/// Warnings are logged only; they are expected and not worth an event.
pub fn report(err: &StorefrontError) {
    if err.is_warning() {
        tracing::warn!(error = %err, "Storefront operation refused");
        return;
    }

    let event_id = sentry::capture_error(err);
    tracing::error!(
        error = %err,
        sentry_event_id = %event_id,
        "Storefront operation failed"
    );
}
