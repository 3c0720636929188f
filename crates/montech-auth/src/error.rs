//! Crate-level error type

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::generator::TokenError;
use crate::password::PasswordError;
use crate::repository::RepositoryError;
use crate::validator::ValidationError;

/// Message shown to clients for every authentication failure
pub const UNAUTHENTICATED_MESSAGE: &str = "unauthenticated";

/// Errors surfaced by the authentication services
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Token generation failed: {0}")]
    Token(#[from] TokenError),

    #[error("Token validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("No authenticated user in the current request")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

impl AuthError {
    /// Whether the request should be rejected as unauthenticated (401)
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::Validation(_) | AuthError::Unauthenticated | AuthError::InvalidCredentials
        )
    }

    /// Message safe to return to an end client
    ///
    /// Validation failures all collapse into the same text.
    pub fn client_message(&self) -> &'static str {
        if self.is_unauthenticated() {
            UNAUTHENTICATED_MESSAGE
        } else {
            "internal error"
        }
    }
}
