//! Saved shipping addresses and the address chosen for checkout.

use std::sync::Arc;

use kartwheel_core::{Address, AddressId, AddressSelection, AddressText};
use secrecy::SecretString;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::api::StoreBackend;
use crate::error::{Result, StorefrontError};
use crate::session::SessionManager;

#[derive(Debug, Default)]
struct State {
    addresses: Vec<Address>,
    selection: AddressSelection,
}

/// The address book held still while an order is placed.
///
/// Deletes, reloads and selection changes wait until this is dropped.
pub struct SelectionLock<'a> {
    state: MutexGuard<'a, State>,
}

impl SelectionLock<'_> {
    /// ID of the selected address, if it is still saved.
    #[must_use]
    pub fn selected_id(&self) -> Option<&AddressId> {
        let id = self.state.selection.get()?;
        self.state.addresses.iter().any(|a| &a.id == id).then_some(id)
    }
}

/// The shopper's saved addresses.
///
/// Changes are applied locally only after the backend confirms them. The
/// selection follows an address by ID, so deleting another address never
/// moves it.
pub struct AddressBook {
    backend: Arc<dyn StoreBackend>,
    sessions: Arc<SessionManager>,
    state: Mutex<State>,
}

impl AddressBook {
    #[must_use]
    pub fn new(backend: Arc<dyn StoreBackend>, sessions: Arc<SessionManager>) -> Self {
        Self {
            backend,
            sessions,
            state: Mutex::new(State::default()),
        }
    }

    /// Fetch the saved addresses, replacing the local list.
    ///
    /// The selection survives only if its address is still there.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` or a backend error.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Address>> {
        let token = self.sessions.token()?;
        let mut state = self.state.lock().await;

        let addresses = self.backend.addresses(&token).await?;
        state.selection.retain_in(&addresses);
        state.addresses = addresses;
        Ok(state.addresses.clone())
    }

    /// Save a new address.
    ///
    /// Returns the updated list, which the backend ends with the new address.
    ///
    /// # Errors
    ///
    /// Returns `Address(TooShort)` for text under 20 characters,
    /// `NotAuthenticated`, or a backend error.
    #[instrument(skip(self, text))]
    pub async fn add(&self, text: &str) -> Result<Vec<Address>> {
        let text = AddressText::parse(text)?;
        let token = self.sessions.token()?;
        let mut state = self.state.lock().await;

        let addresses = self.backend.add_address(&token, &text).await?;
        state.selection.retain_in(&addresses);
        state.addresses = addresses;
        Ok(state.addresses.clone())
    }

    /// Delete the address shown at `index`.
    ///
    /// # Errors
    ///
    /// Returns `AddressNotFound` if `index` is out of range,
    /// `NotAuthenticated`, or a backend error.
    #[instrument(skip(self))]
    pub async fn delete(&self, index: usize) -> Result<Address> {
        let token = self.sessions.token()?;
        let mut state = self.state.lock().await;

        let id = state
            .addresses
            .get(index)
            .map(|a| a.id.clone())
            .ok_or_else(|| StorefrontError::AddressNotFound(format!("#{}", index + 1)))?;
        self.delete_locked(&token, &mut state, &id).await
    }

    /// Delete the address with `id`.
    ///
    /// # Errors
    ///
    /// Returns `AddressNotFound`, `NotAuthenticated`, or a backend error.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete_by_id(&self, id: &AddressId) -> Result<Address> {
        let token = self.sessions.token()?;
        let mut state = self.state.lock().await;
        self.delete_locked(&token, &mut state, id).await
    }

    /// Choose the address for the next order.
    ///
    /// # Errors
    ///
    /// Returns `AddressNotFound` if no saved address has `id`.
    pub async fn select(&self, id: &AddressId) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.addresses.iter().any(|a| &a.id == id) {
            return Err(StorefrontError::AddressNotFound(id.to_string()));
        }
        state.selection.select(id.clone());
        Ok(())
    }

    /// Choose the address shown at `index`.
    ///
    /// # Errors
    ///
    /// Returns `AddressNotFound` if `index` is out of range.
    pub async fn select_index(&self, index: usize) -> Result<AddressId> {
        let mut state = self.state.lock().await;
        let id = state
            .addresses
            .get(index)
            .map(|a| a.id.clone())
            .ok_or_else(|| StorefrontError::AddressNotFound(format!("#{}", index + 1)))?;
        state.selection.select(id.clone());
        Ok(id)
    }

    pub async fn clear_selection(&self) {
        self.state.lock().await.selection.clear();
    }

    /// The selected address, if any.
    pub async fn selected(&self) -> Option<Address> {
        let state = self.state.lock().await;
        let id = state.selection.get()?;
        state.addresses.iter().find(|a| &a.id == id).cloned()
    }

    /// Hold the book still until the returned lock is dropped.
    pub async fn lock_selection(&self) -> SelectionLock<'_> {
        SelectionLock {
            state: self.state.lock().await,
        }
    }

    /// A snapshot of the local list.
    pub async fn addresses(&self) -> Vec<Address> {
        self.state.lock().await.addresses.clone()
    }

    /// Forget every address and the selection. Used at logout.
    pub async fn clear_local(&self) {
        *self.state.lock().await = State::default();
    }

    async fn delete_locked(
        &self,
        token: &SecretString,
        state: &mut State,
        id: &AddressId,
    ) -> Result<Address> {
        let index = state
            .addresses
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| StorefrontError::AddressNotFound(id.to_string()))?;

        self.backend.delete_address(token, id).await?;

        let removed = state.addresses.remove(index);
        if state.selection.clear_if(id) {
            debug!("Deleted the selected address; selection cleared");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use kartwheel_core::{AddressError, Money};

    use super::*;
    use crate::session::{MemoryStore, Session};
    use crate::testing::{FakeBackend, address};

    fn book(backend: &Arc<FakeBackend>) -> AddressBook {
        let sessions = Arc::new(SessionManager::new(Box::new(MemoryStore::new())));
        sessions
            .start(Session::new("tok", "crio.do", Money::from_units(5000)))
            .unwrap();
        AddressBook::new(backend.clone(), sessions)
    }

    fn seeded() -> Arc<FakeBackend> {
        Arc::new(FakeBackend::new().with_addresses(vec![
            address("a1"),
            address("a2"),
            address("a3"),
        ]))
    }

    #[tokio::test]
    async fn test_add_too_short_makes_no_call() {
        let backend = seeded();
        let book = book(&backend);

        let err = book.add("Mumbai").await.unwrap_err();

        assert!(matches!(
            err,
            StorefrontError::Address(AddressError::TooShort { min: 20, .. })
        ));
        assert_eq!(err.user_message(), "Please enter your full address.");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_replaces_list() {
        let backend = seeded();
        let book = book(&backend);
        book.load().await.unwrap();

        let list = book
            .add("  12th street, Andheri East, Mumbai 400069  ")
            .await
            .unwrap();

        assert_eq!(list.len(), 4);
        assert_eq!(list[3].text, "12th street, Andheri East, Mumbai 400069");
        assert_eq!(book.addresses().await, list);
    }

    #[tokio::test]
    async fn test_delete_selected_clears_selection() {
        let backend = seeded();
        let book = book(&backend);
        book.load().await.unwrap();
        book.select(&AddressId::new("a2")).await.unwrap();

        let removed = book.delete(1).await.unwrap();

        assert_eq!(removed.id.as_str(), "a2");
        assert!(book.selected().await.is_none());
        assert_eq!(backend.remote_addresses().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_other_keeps_selection() {
        let backend = seeded();
        let book = book(&backend);
        book.load().await.unwrap();
        book.select_index(2).await.unwrap();

        // Deleting an earlier entry shifts indexes but not the selection
        book.delete(0).await.unwrap();

        assert_eq!(book.selected().await.unwrap().id.as_str(), "a3");
    }

    #[tokio::test]
    async fn test_delete_out_of_range() {
        let backend = seeded();
        let book = book(&backend);
        book.load().await.unwrap();

        assert!(matches!(
            book.delete(7).await,
            Err(StorefrontError::AddressNotFound(_))
        ));
        assert_eq!(backend.call_count("delete_address"), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_list() {
        let backend = seeded();
        let book = book(&backend);
        book.load().await.unwrap();
        backend.fail_with(404, "Address to delete was not found");

        assert!(book.delete_by_id(&AddressId::new("a1")).await.is_err());
        assert_eq!(book.addresses().await.len(), 3);
    }

    #[tokio::test]
    async fn test_select_unknown() {
        let backend = seeded();
        let book = book(&backend);
        book.load().await.unwrap();

        assert!(matches!(
            book.select(&AddressId::new("zz")).await,
            Err(StorefrontError::AddressNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reload_drops_stale_selection() {
        let backend = seeded();
        let book = book(&backend);
        book.load().await.unwrap();
        book.select(&AddressId::new("a1")).await.unwrap();

        // Deleted from another device
        backend
            .delete_address(&SecretString::from("tok"), &AddressId::new("a1"))
            .await
            .unwrap();

        book.load().await.unwrap();
        assert!(book.selected().await.is_none());
    }
}
