//! Login, registration and logout.
//!
//! Credentials are validated locally first; invalid input never reaches the
//! backend. Token issuance is entirely the backend's business.

use std::sync::Arc;

use kartwheel_core::{Email, Password, Username};
use tracing::{info, instrument};

use crate::api::StoreBackend;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::session::{Session, SessionManager};

/// Session lifecycle operations.
pub struct AuthService {
    backend: Arc<dyn StoreBackend>,
    sessions: Arc<SessionManager>,
}

impl AuthService {
    #[must_use]
    pub fn new(backend: Arc<dyn StoreBackend>, sessions: Arc<SessionManager>) -> Self {
        Self { backend, sessions }
    }

    /// Log in and persist the new session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a missing or short username or password,
    /// a backend error for rejected credentials, or a store error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let username = Username::parse(username)?;
        let password = Password::parse(password)?;

        let response = self.backend.login(&username, &password).await?;
        let session = Session::new(response.token, response.username, response.balance);
        self.sessions.start(session.clone())?;

        set_sentry_user(session.username());
        info!(username = %session.username(), "Logged in");
        Ok(session)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for invalid fields or mismatched passwords, or
    /// a backend error (e.g. the username is taken).
    #[instrument(skip(self, email, password, confirm))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<()> {
        let username = Username::parse(username)?;
        let password = Password::parse_confirmed(password, confirm)?;
        let email = Email::parse(email)?;

        self.backend.register(&username, &email, &password).await?;
        info!(username = %username, "Registered");
        Ok(())
    }

    /// End the session and wipe the session store.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be cleared. The in-memory
    /// session is gone either way.
    pub fn logout(&self) -> Result<()> {
        let result = self.sessions.end();
        clear_sentry_user();
        info!("Logged out");
        result
    }

    /// Pick up a session persisted by an earlier process.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be read.
    pub fn restore(&self) -> Result<Option<Session>> {
        let session = self.sessions.restore()?;
        if let Some(session) = &session {
            set_sentry_user(session.username());
        }
        Ok(session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kartwheel_core::Money;

    use super::*;
    use crate::error::StorefrontError;
    use crate::session::MemoryStore;
    use crate::testing::FakeBackend;

    fn service(backend: &Arc<FakeBackend>) -> (AuthService, Arc<SessionManager>) {
        let sessions = Arc::new(SessionManager::new(Box::new(MemoryStore::new())));
        (AuthService::new(backend.clone(), sessions.clone()), sessions)
    }

    #[tokio::test]
    async fn test_login_starts_session() {
        let backend = Arc::new(FakeBackend::new().with_user("crio.do", "learnwithcrio", 5000));
        let (auth, sessions) = service(&backend);

        let session = auth.login("crio.do", "learnwithcrio").await.unwrap();

        assert_eq!(session.username(), "crio.do");
        assert!(sessions.is_authenticated());
        assert_eq!(sessions.balance().unwrap(), Money::from_units(5000));
    }

    #[tokio::test]
    async fn test_login_validates_locally() {
        let backend = Arc::new(FakeBackend::new());
        let (auth, sessions) = service(&backend);

        let err = auth.login("crio", "learnwithcrio").await.unwrap_err();
        assert_eq!(err.user_message(), "Username must be at least 6 characters");

        let err = auth.login("crio.do", "").await.unwrap_err();
        assert_eq!(err.user_message(), "Password is a required field");

        assert!(backend.calls().is_empty());
        assert!(!sessions.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let backend = Arc::new(FakeBackend::new().with_user("crio.do", "learnwithcrio", 5000));
        let (auth, sessions) = service(&backend);

        let err = auth.login("crio.do", "wrong-password").await.unwrap_err();

        assert!(matches!(err, StorefrontError::BackendRejected { status: 400, .. }));
        assert_eq!(err.user_message(), "Password is incorrect");
        assert!(!sessions.is_authenticated());
    }

    #[tokio::test]
    async fn test_register() {
        let backend = Arc::new(FakeBackend::new());
        let (auth, _) = service(&backend);

        auth.register("crio.do", "learner@crio.do", "learnwithcrio", "learnwithcrio")
            .await
            .unwrap();
        assert_eq!(backend.call_count("register"), 1);

        let err = auth
            .register("crio.do", "learner@crio.do", "learnwithcrio", "learnwithcrio")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Username is already taken");
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let backend = Arc::new(FakeBackend::new());
        let (auth, _) = service(&backend);

        let err = auth
            .register("crio.do", "learner@crio.do", "learnwithcrio", "learnwithcri0")
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Passwords do not match");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_register_bad_email() {
        let backend = Arc::new(FakeBackend::new());
        let (auth, _) = service(&backend);

        let err = auth
            .register("crio.do", "learner", "learnwithcrio", "learnwithcrio")
            .await
            .unwrap_err();

        assert!(matches!(err, StorefrontError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_logout_and_restore() {
        let backend = Arc::new(FakeBackend::new().with_user("crio.do", "learnwithcrio", 5000));
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(SessionManager::new(Box::new(store.clone())));
        let auth = AuthService::new(backend.clone(), sessions.clone());
        auth.login("crio.do", "learnwithcrio").await.unwrap();

        // A fresh process sees the stored session
        let later = AuthService::new(
            backend.clone(),
            Arc::new(SessionManager::new(Box::new(store.clone()))),
        );
        assert!(later.restore().unwrap().is_some());

        auth.logout().unwrap();
        assert!(!sessions.is_authenticated());
        assert!(later.restore().unwrap().is_none());
    }
}
