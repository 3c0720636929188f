//! Access token issuance

use chrono::{DateTime, SubsecRound, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::SigningConfig;
use crate::identity::Identity;
use crate::jwt::AccessClaims;

/// A freshly issued, signed access token
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    /// Compact JWS (`header.payload.signature`)
    pub encoded_value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.encoded_value
    }

    /// Value for an `Authorization` header
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.encoded_value)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Token generation errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("JWT encoding error: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),
}

/// Issues access tokens for authenticated identities
pub trait AccessTokenGenerator: Send + Sync {
    /// Sign a new token for `identity`
    ///
    /// `expires_at - issued_at` always equals the configured lifetime. Two
    /// calls never return the same encoded value.
    fn generate(&self, identity: &Identity) -> Result<AccessToken, TokenError>;
}

/// HMAC-signed JWT generator
///
/// Tokens are signed with the algorithm named in the [`SigningConfig`] and
/// carry `sub`, `iat`, `exp`, a random `jti` and the identity's claims.
pub struct JwtTokenGenerator {
    config: Arc<SigningConfig>,
    encoding_key: EncodingKey,
    clock: Arc<dyn Clock>,
}

impl JwtTokenGenerator {
    /// Create a generator that signs with `config`
    ///
    /// The encoding key is derived once here. Pass the same `Arc` to
    /// [`JwtTokenValidator::new`](crate::validator::JwtTokenValidator::new) so
    /// both sides agree on key, algorithm and lifetime. Timestamps come from
    /// [`SystemClock`] unless replaced with [`with_clock`](Self::with_clock).
    ///
    /// # Arguments
    /// * `config` - Validated signing configuration
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use chrono::Duration;
    /// use montech_auth::{
    ///     AccessTokenGenerator, Identity, JwtTokenGenerator, SigningAlgorithm, SigningConfig,
    /// };
    ///
    /// let config = Arc::new(SigningConfig::new(b"secret", 30, SigningAlgorithm::Hs256).unwrap());
    /// let generator = JwtTokenGenerator::new(config);
    ///
    /// let token = generator
    ///     .generate(&Identity::new("user-123").with_claim("role", "admin"))
    ///     .unwrap();
    /// assert_eq!(token.expires_at - token.issued_at, Duration::minutes(30));
    /// assert_eq!(token.as_str().split('.').count(), 3);
    /// ```
    pub fn new(config: Arc<SigningConfig>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.signing_key());

        Self {
            config,
            encoding_key,
            clock: Arc::new(SystemClock),
        }
    }

    /// Take `iat` from `clock` instead of the system clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl AccessTokenGenerator for JwtTokenGenerator {
    fn generate(&self, identity: &Identity) -> Result<AccessToken, TokenError> {
        if identity.user_id.is_empty() {
            return Err(TokenError::InvalidIdentity(
                "user id must not be empty".to_string(),
            ));
        }

        // JWT timestamps are whole seconds
        let issued_at = self.clock.now().trunc_subsecs(0);
        let expires_at = issued_at + self.config.expiration();

        let claims = AccessClaims::new(identity, issued_at, expires_at);
        let header = Header::new(self.config.algorithm().as_jwt_algorithm());
        let encoded_value = encode(&header, &claims, &self.encoding_key)?;

        debug!(
            "Issued access token for user {} (jti={}, expires {})",
            identity.user_id, claims.jti, expires_at
        );

        Ok(AccessToken {
            encoded_value,
            issued_at,
            expires_at,
        })
    }
}
