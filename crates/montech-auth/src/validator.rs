//! Access token validation
//!
//! A presented token goes through three gates, in order:
//! shape (three base64url segments), signature (HMAC recomputed and compared
//! in constant time by `jsonwebtoken`), then expiry against the injected clock.
//! Each gate has exactly one failure kind and nothing more is reported.

use jsonwebtoken::{decode, DecodingKey, Validation};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SigningConfig;
use crate::identity::Identity;
use crate::jwt::{check_compact_shape, classify, AccessClaims};

/// Token validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,
}

/// Verifies access tokens and recovers the identity inside
pub trait AccessTokenValidator: Send + Sync {
    /// Check `token` and return the identity it was issued for
    ///
    /// Pure with respect to the token: validating the same token twice at
    /// the same instant gives the same answer.
    fn validate(&self, token: &str) -> Result<Identity, ValidationError>;
}

/// HMAC JWT validator
///
/// Holds the decoding key derived from a [`SigningConfig`] and a tuned
/// [`Validation`]. Immutable after construction, so one instance can be
/// shared behind an `Arc` by every request handler.
pub struct JwtTokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtTokenValidator {
    /// Create a validator for tokens signed with `config`
    ///
    /// Only the configured algorithm is accepted; a header naming any other
    /// algorithm fails signature verification. `exp`, `iat` and `sub` are
    /// required. Expiry is not left to `jsonwebtoken`: it is checked with zero
    /// leeway against the validator's [`Clock`], which defaults to
    /// [`SystemClock`].
    ///
    /// # Arguments
    /// * `config` - Signing key, algorithm and lifetime shared with the generator
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use montech_auth::{
    ///     AccessTokenGenerator, AccessTokenValidator, Identity, JwtTokenGenerator,
    ///     JwtTokenValidator, SigningAlgorithm, SigningConfig,
    /// };
    ///
    /// let config = Arc::new(SigningConfig::new(b"secret", 30, SigningAlgorithm::Hs256).unwrap());
    /// let generator = JwtTokenGenerator::new(config.clone());
    /// let validator = JwtTokenValidator::new(config);
    ///
    /// let token = generator.generate(&Identity::new("user-123")).unwrap();
    /// let identity = validator.validate(token.as_str()).unwrap();
    /// assert_eq!(identity.user_id, "user-123");
    /// ```
    pub fn new(config: Arc<SigningConfig>) -> Self {
        let mut validation = Validation::new(config.algorithm().as_jwt_algorithm());
        // Expiry is checked against our own clock, strictly
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.signing_key()),
            validation,
            clock: Arc::new(SystemClock),
        }
    }

    /// Read the current time from `clock` instead of the system clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate a token and return its raw claims
    ///
    /// Same checks as [`AccessTokenValidator::validate`], but keeps the
    /// registered claims (`iat`, `exp`, `jti`) for callers that need them.
    ///
    /// # Arguments
    /// * `token` - Compact JWS as presented by the client, without the `Bearer ` prefix
    ///
    /// # Returns
    /// * `Ok(AccessClaims)` - Signature verified and `now < exp`
    /// * `Err(ValidationError::Malformed)` - Not three base64url segments, or
    ///   the payload is not a valid claims object (including an empty `sub`)
    /// * `Err(ValidationError::InvalidSignature)` - Signed with another key or algorithm
    /// * `Err(ValidationError::Expired)` - Signature fine, but `now >= exp`
    ///
    /// Checks run in that order, so an expired token with a bad signature
    /// reports `InvalidSignature`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use chrono::Duration;
    /// use montech_auth::{
    ///     AccessTokenGenerator, Identity, JwtTokenGenerator, JwtTokenValidator, ManualClock,
    ///     SigningAlgorithm, SigningConfig, ValidationError,
    /// };
    ///
    /// let config = Arc::new(SigningConfig::new(b"secret", 5, SigningAlgorithm::Hs256).unwrap());
    /// let clock = Arc::new(ManualClock::default());
    /// let generator = JwtTokenGenerator::new(config.clone()).with_clock(clock.clone());
    /// let validator = JwtTokenValidator::new(config).with_clock(clock.clone());
    ///
    /// let token = generator.generate(&Identity::new("user-123")).unwrap();
    /// let claims = validator.validate_claims(token.as_str()).unwrap();
    /// assert_eq!(claims.exp, token.expires_at.timestamp());
    ///
    /// clock.advance(Duration::minutes(5));
    /// assert_eq!(
    ///     validator.validate_claims(token.as_str()),
    ///     Err(ValidationError::Expired)
    /// );
    /// ```
    pub fn validate_claims(&self, token: &str) -> Result<AccessClaims, ValidationError> {
        check_compact_shape(token)?;

        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let kind = classify(&e);
                warn!("Access token rejected: {} ({})", kind, e);
                kind
            })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            warn!("Access token rejected: empty subject");
            return Err(ValidationError::Malformed);
        }

        if claims.is_expired_at(self.clock.now()) {
            debug!("Access token for user {} expired", claims.sub);
            return Err(ValidationError::Expired);
        }

        Ok(claims)
    }
}

impl AccessTokenValidator for JwtTokenValidator {
    fn validate(&self, token: &str) -> Result<Identity, ValidationError> {
        let claims = self.validate_claims(token)?;
        debug!("Access token verified for user {}", claims.sub);
        Ok(claims.into_identity())
    }
}
