//! Shipping addresses and address selection.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::id::AddressId;

/// Errors that can occur when validating a new address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The address text is shorter than the backend accepts.
    #[error("address must be at least {min} characters (got {actual})")]
    TooShort {
        /// Minimum accepted length.
        min: usize,
        /// Length of the rejected input.
        actual: usize,
    },
}

/// A saved shipping address.
///
/// The wire format is `{"_id": ..., "address": ...}`; `id` and `text` are
/// accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Stable backend identifier.
    #[serde(rename = "_id", alias = "id")]
    pub id: AddressId,
    /// Full address text.
    #[serde(rename = "address", alias = "text")]
    pub text: String,
}

/// Validated text for a new address.
///
/// ## Constraints
///
/// - At least 20 characters after trimming surrounding whitespace
///
/// ## Examples
///
/// ```
/// use kartwheel_core::AddressText;
///
/// assert!(AddressText::parse("12th street, Mumbai 400001").is_ok());
/// assert!(AddressText::parse("Mumbai").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressText(String);

impl AddressText {
    /// Minimum length, matching the backend's validation.
    pub const MIN_LENGTH: usize = 20;

    /// Parse address text.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::TooShort` if the trimmed input has fewer than
    /// [`Self::MIN_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let trimmed = s.trim();
        let actual = trimmed.chars().count();
        if actual < Self::MIN_LENGTH {
            return Err(AddressError::TooShort {
                min: Self::MIN_LENGTH,
                actual,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the address text as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddressText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The address chosen for the next order.
///
/// Tracks the address by its stable ID, so deleting some other address
/// never shifts the selection onto a different one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSelection(Option<AddressId>);

impl AddressSelection {
    /// No address selected.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Select `id`.
    pub fn select(&mut self, id: AddressId) {
        self.0 = Some(id);
    }

    /// Clear the selection.
    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// The selected address ID, if any.
    #[must_use]
    pub const fn get(&self) -> Option<&AddressId> {
        self.0.as_ref()
    }

    /// Whether `id` is the selected address.
    #[must_use]
    pub fn is_selected(&self, id: &AddressId) -> bool {
        self.0.as_ref() == Some(id)
    }

    /// Clear the selection if it points at `id`. Returns whether it did.
    pub fn clear_if(&mut self, id: &AddressId) -> bool {
        if self.is_selected(id) {
            self.0 = None;
            return true;
        }
        false
    }

    /// Keep the selection only if it is still one of `addresses`.
    pub fn retain_in(&mut self, addresses: &[Address]) {
        if let Some(id) = &self.0
            && !addresses.iter().any(|a| &a.id == id)
        {
            self.0 = None;
        }
    }
}
