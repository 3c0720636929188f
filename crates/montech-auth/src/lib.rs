//! Access-token authentication for the Montech backend
//!
//! Issues and validates signed JWT access tokens, and exposes the identity
//! behind the current request to business logic.

pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod identity;
pub mod jwt;
pub mod logged_user;
pub mod password;
pub mod repository;
pub mod service;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigurationError, JwtSettings, Settings, SigningAlgorithm, SigningConfig};
pub use error::AuthError;
pub use generator::{AccessToken, AccessTokenGenerator, JwtTokenGenerator, TokenError};
pub use identity::Identity;
pub use jwt::AccessClaims;
pub use logged_user::{extract_bearer_token, LoggedUser};
pub use password::{hash_password, verify_password, PasswordError};
pub use repository::{
    Credential, InMemoryUserRepository, RepositoryError, UserRecord, UserRepository, UserRole,
};
pub use service::AuthService;
pub use validator::{AccessTokenValidator, JwtTokenValidator, ValidationError};

// Re-export useful types
pub use async_trait::async_trait;
