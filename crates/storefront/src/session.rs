//! Login session and its persistence.
//!
//! A [`Session`] exists from login until logout and is the only source of
//! truth for the bearer token and spendable balance. [`SessionManager`]
//! owns it and mirrors it into a [`SessionStore`] under the keys `token`,
//! `username` and `balance`, so a later process can pick it up again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use kartwheel_core::Money;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::error::{Result, StorefrontError};

pub const TOKEN_KEY: &str = "token";
pub const USERNAME_KEY: &str = "username";
pub const BALANCE_KEY: &str = "balance";

/// Errors raised by a [`SessionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A logged-in shopper.
#[derive(Debug, Clone)]
pub struct Session {
    token: SecretString,
    username: String,
    balance: Money,
}

impl Session {
    #[must_use]
    pub fn new(token: impl Into<String>, username: impl Into<String>, balance: Money) -> Self {
        Self {
            token: SecretString::from(token.into()),
            username: username.into(),
            balance,
        }
    }

    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn balance(&self) -> Money {
        self.balance
    }
}

/// Simple string key-value storage for the session.
pub trait SessionStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> std::result::Result<(), StoreError>;

    /// Remove every value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> std::result::Result<(), StoreError>;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn clear(&self) -> std::result::Result<(), StoreError> {
        (**self).clear()
    }
}

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> std::result::Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Store backed by a JSON object in a file.
///
/// A missing file reads as empty. Every write rewrites the whole file, so a
/// file that cannot be read is never written over.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> std::result::Result<HashMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, values: &HashMap<String, String>) -> std::result::Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read()?;
        values.insert(key.to_string(), value.to_string());
        self.write(&values)
    }

    fn clear(&self) -> std::result::Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Owns the current session and keeps the store in step with it.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    current: RwLock<Option<Session>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager with no session. Call [`Self::restore`] to pick up
    /// a stored one.
    #[must_use]
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// Rebuild the session from the store.
    ///
    /// Partial or unparsable contents count as logged out.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn restore(&self) -> Result<Option<Session>> {
        let token = self.store.get(TOKEN_KEY)?;
        let username = self.store.get(USERNAME_KEY)?;
        let balance = self.store.get(BALANCE_KEY)?;

        let session = match (token, username, balance) {
            (Some(token), Some(username), Some(balance)) if !token.is_empty() => balance
                .parse::<Money>()
                .ok()
                .map(|balance| Session::new(token, username, balance)),
            _ => None,
        };

        if session.is_none() {
            tracing::debug!("No stored session");
        }
        self.replace(session.clone());
        Ok(session)
    }

    /// Make `session` current and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written; the session is not
    /// made current in that case.
    pub fn start(&self, session: Session) -> Result<()> {
        self.store
            .set(TOKEN_KEY, session.token.expose_secret())?;
        self.store.set(USERNAME_KEY, &session.username)?;
        self.store
            .set(BALANCE_KEY, &session.balance.amount().to_string())?;
        self.replace(Some(session));
        Ok(())
    }

    /// Drop the session and clear the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared. The in-memory
    /// session is dropped regardless.
    pub fn end(&self) -> Result<()> {
        self.replace(None);
        self.store.clear()?;
        Ok(())
    }

    /// The current session, if logged in.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The bearer token of the current session.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when logged out.
    pub fn token(&self) -> Result<SecretString> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or(StorefrontError::NotAuthenticated)
    }

    /// The spendable balance of the current session.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when logged out.
    pub fn balance(&self) -> Result<Money> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Session::balance)
            .ok_or(StorefrontError::NotAuthenticated)
    }

    /// Commit a new balance to the session and the store.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when logged out, or a store error.
    pub fn set_balance(&self, balance: Money) -> Result<()> {
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let session = current.as_mut().ok_or(StorefrontError::NotAuthenticated)?;
            session.balance = balance;
        }
        self.store.set(BALANCE_KEY, &balance.amount().to_string())?;
        Ok(())
    }

    fn replace(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}
