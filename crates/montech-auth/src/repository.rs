//! User lookup collaborator
//!
//! The token core only needs to turn a credential into an [`Identity`].
//! Storage is pluggable through [`UserRepository`]; an in-memory implementation
//! is provided for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::identity::Identity;
use crate::password::{hash_password, verify_against_dummy, verify_password, PasswordError};

/// Login credential
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

/// Stored user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    /// Unique, stored lower-cased
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Identity embedded in access tokens issued to this user
    pub fn identity(&self) -> Identity {
        let identity = Identity::new(self.id.to_string())
            .with_claim("email", self.email.clone())
            .with_claim("role", self.role.as_str());

        match &self.full_name {
            Some(name) => identity.with_claim("name", name.clone()),
            None => identity,
        }
    }
}

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("A user with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Read access to users, as needed by authentication
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find the active user matching `credential`
    ///
    /// `Ok(None)` means no such user, or the password did not match.
    async fn find_user_by_credential(
        &self,
        credential: &Credential,
    ) -> Result<Option<Identity>, RepositoryError>;

    /// Find a user by ID (the token subject)
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, RepositoryError>;
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// In-memory user store
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new active user, hashing the password
    pub async fn add_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
        role: UserRole,
    ) -> Result<UserRecord, RepositoryError> {
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: hash_password(password)?,
            full_name,
            role,
            is_active: true,
            created_at: Utc::now(),
        };

        self.insert(record.clone()).await?;
        Ok(record)
    }

    /// Insert a prepared record
    pub async fn insert(&self, mut record: UserRecord) -> Result<(), RepositoryError> {
        record.email = normalize_email(&record.email);

        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == record.email) {
            return Err(RepositoryError::DuplicateEmail(record.email));
        }

        users.insert(record.id, record);
        Ok(())
    }

    pub async fn set_active(&self, user_id: Uuid, active: bool) -> bool {
        match self.users.write().await.get_mut(&user_id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_user_by_credential(
        &self,
        credential: &Credential,
    ) -> Result<Option<Identity>, RepositoryError> {
        let email = normalize_email(&credential.email);

        let user = {
            let users = self.users.read().await;
            users
                .values()
                .find(|u| u.email == email && u.is_active)
                .cloned()
        };

        let Some(user) = user else {
            // Same Argon2 cost as a wrong password, so misses don't reveal accounts
            verify_against_dummy(&credential.password);
            return Ok(None);
        };

        if verify_password(&credential.password, &user.password_hash)? {
            Ok(Some(user.identity()))
        } else {
            Ok(None)
        }
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let Ok(id) = Uuid::parse_str(user_id) else {
            return Ok(None);
        };

        Ok(self.users.read().await.get(&id).cloned())
    }
}
