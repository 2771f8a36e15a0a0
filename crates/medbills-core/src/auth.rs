//! Credential gate in front of the dashboard.
//!
//! A single fixed username/password pair compared in plaintext. There is no
//! lockout, rate limiting or hashing.

use thiserror::Error;

/// Login errors. Never says which field was wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,
}

/// The one credential pair the system accepts.
#[derive(Clone)]
pub struct CredentialGate {
    username: String,
    password: String,
}

impl CredentialGate {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Succeeds iff both values match exactly.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username == self.username && password == self.password {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
