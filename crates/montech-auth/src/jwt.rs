//! JWT claims layout and compact-serialization helpers

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::identity::Identity;
use crate::validator::ValidationError;

/// Claims embedded in an access token
///
/// Registered claims sit at the top level; the identity's own claims travel
/// in a nested `claims` object so they can never shadow `sub` or `exp`.
///
/// ```json
/// {
///   "sub": "3f2c…",
///   "iat": 1700000000,
///   "exp": 1700001800,
///   "jti": "9b1d…",
///   "claims": { "email": "ana@montech.dev", "role": "admin" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
    /// Token ID, unique per issuance
    #[serde(default)]
    pub jti: String,
    /// Identity claims
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub claims: BTreeMap<String, String>,
}

impl AccessClaims {
    /// Build the claims for one issuance
    ///
    /// # Arguments
    /// * `identity` - Becomes `sub` plus the nested `claims`
    /// * `issued_at` - Truncated to whole seconds in `iat`
    /// * `expires_at` - Truncated to whole seconds in `exp`
    ///
    /// A fresh `jti` is drawn each call.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chrono::{DateTime, Duration, Utc};
    /// use montech_auth::{AccessClaims, Identity};
    ///
    /// let issued_at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    /// let claims = AccessClaims::new(
    ///     &Identity::new("user-123"),
    ///     issued_at,
    ///     issued_at + Duration::minutes(30),
    /// );
    ///
    /// assert_eq!(claims.sub, "user-123");
    /// assert_eq!(claims.exp - claims.iat, 30 * 60);
    /// ```
    pub fn new(identity: &Identity, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: identity.user_id.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            claims: identity.claims.clone(),
        }
    }

    /// `exp` as a timestamp, `None` if out of range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.exp, 0)
    }

    /// Strict expiry: a token is expired at its `exp` instant, not after it
    ///
    /// # Returns
    /// `true` when `now >= exp`, or when `exp` cannot be represented.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    /// Drop the registered claims and keep who the token was issued for
    pub fn into_identity(self) -> Identity {
        Identity {
            user_id: self.sub,
            claims: self.claims,
        }
    }
}

/// Check the compact shape: exactly three non-empty base64url segments
pub(crate) fn check_compact_shape(token: &str) -> Result<(), ValidationError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(ValidationError::Malformed);
    }

    for segment in segments {
        if segment.is_empty() || URL_SAFE_NO_PAD.decode(segment).is_err() {
            return Err(ValidationError::Malformed);
        }
    }

    Ok(())
}

/// Collapse jsonwebtoken failures into the three externally visible kinds
///
/// A header naming another algorithm counts as a bad signature. Anything
/// that is neither a signature nor an expiry problem (bad JSON, missing
/// required claim, bad base64) is `Malformed`.
pub(crate) fn classify(error: &jsonwebtoken::errors::Error) -> ValidationError {
    match error.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            ValidationError::InvalidSignature
        }
        ErrorKind::ExpiredSignature => ValidationError::Expired,
        _ => ValidationError::Malformed,
    }
}
