//! Login and registration credentials.
//!
//! Field rules are checked locally before any request reaches the backend.

use core::fmt;

/// Errors that can occur when validating credentials.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Username is a required field")]
    UsernameRequired,
    #[error("Username must be at least {min} characters")]
    UsernameTooShort { min: usize },
    #[error("Password is a required field")]
    PasswordRequired,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// A validated username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Minimum username length.
    pub const MIN_LENGTH: usize = 6;

    /// Parse a username.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or shorter than
    /// [`Self::MIN_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CredentialError::UsernameRequired);
        }
        if s.chars().count() < Self::MIN_LENGTH {
            return Err(CredentialError::UsernameTooShort {
                min: Self::MIN_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated password.
///
/// Implements `Debug` manually to redact the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Minimum password length.
    pub const MIN_LENGTH: usize = 6;

    /// Parse a password. Whitespace is significant and kept as typed.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or shorter than
    /// [`Self::MIN_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        if s.is_empty() {
            return Err(CredentialError::PasswordRequired);
        }
        if s.chars().count() < Self::MIN_LENGTH {
            return Err(CredentialError::PasswordTooShort {
                min: Self::MIN_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Parse a password and its confirmation.
    ///
    /// # Errors
    ///
    /// Returns the password's own validation error first, then
    /// `PasswordMismatch` if the confirmation differs.
    pub fn parse_confirmed(password: &str, confirm: &str) -> Result<Self, CredentialError> {
        let parsed = Self::parse(password)?;
        if password != confirm {
            return Err(CredentialError::PasswordMismatch);
        }
        Ok(parsed)
    }

    /// Returns the password for sending to the backend.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert_eq!(Username::parse(""), Err(CredentialError::UsernameRequired));
        assert_eq!(Username::parse("   "), Err(CredentialError::UsernameRequired));
        assert_eq!(
            Username::parse("crio"),
            Err(CredentialError::UsernameTooShort { min: 6 })
        );
        assert_eq!(Username::parse(" crio.do ").unwrap().as_str(), "crio.do");
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(Password::parse(""), Err(CredentialError::PasswordRequired));
        assert_eq!(
            Password::parse("12345"),
            Err(CredentialError::PasswordTooShort { min: 6 })
        );
        assert_eq!(Password::parse("123456").unwrap().expose(), "123456");
    }

    #[test]
    fn test_password_confirmation() {
        assert!(Password::parse_confirmed("learnwithcrio", "learnwithcrio").is_ok());
        assert_eq!(
            Password::parse_confirmed("learnwithcrio", "learnwithcri0"),
            Err(CredentialError::PasswordMismatch)
        );
        // Length is reported before mismatch
        assert_eq!(
            Password::parse_confirmed("abc", "xyz"),
            Err(CredentialError::PasswordTooShort { min: 6 })
        );
    }

    #[test]
    fn test_password_debug_redacted() {
        let password = Password::parse("hunter22").unwrap();
        let debug = format!("{password:?}");
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CredentialError::UsernameTooShort { min: 6 }.to_string(),
            "Username must be at least 6 characters"
        );
        assert_eq!(
            CredentialError::PasswordMismatch.to_string(),
            "Passwords do not match"
        );
    }
}
