//! Logged-user accessor
//!
//! Binds a validated identity to the current task for the duration of one
//! request. Outside a binding scope there is no logged user.

use std::future::Future;
use tracing::debug;

use crate::error::AuthError;
use crate::identity::Identity;
use crate::validator::AccessTokenValidator;

tokio::task_local! {
    static LOGGED_USER: Identity;
}

/// Accessor for the identity bound to the current request scope
///
/// The only way to bind a user is through a successful token validation
/// ([`LoggedUser::authenticate`] or [`LoggedUser::sync_authenticate`]).
/// A hand-built identity cannot be bound:
///
/// ```compile_fail
/// use montech_auth::{Identity, LoggedUser};
///
/// LoggedUser::sync_scope(Identity::new("admin"), || ());
/// ```
pub struct LoggedUser;

impl LoggedUser {
    /// Run `f` with `identity` bound as the logged user
    ///
    /// Crate-private: callers outside go through token validation.
    pub(crate) async fn scope<F>(identity: Identity, f: F) -> F::Output
    where
        F: Future,
    {
        LOGGED_USER.scope(identity, f).await
    }

    pub(crate) fn sync_scope<F, R>(identity: Identity, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        LOGGED_USER.sync_scope(identity, f)
    }

    fn validate_header(
        validator: &dyn AccessTokenValidator,
        authorization: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let token = authorization
            .and_then(extract_bearer_token)
            .ok_or(AuthError::Unauthenticated)?;

        let identity = validator.validate(token)?;
        debug!("Request bound to user {}", identity.user_id);

        Ok(identity)
    }

    /// Validate the bearer token in `authorization` and run `f` as that user
    ///
    /// # Arguments
    /// * `validator` - Validator holding the shared signing config
    /// * `authorization` - Raw `Authorization` header value, if any
    /// * `f` - Request handling future; sees the user via [`LoggedUser::current_user`]
    ///
    /// # Returns
    /// * `Ok(output)` - The output of `f`, run with the user bound
    /// * `Err(AuthError)` - Missing header or failed validation; `f` is not run
    pub async fn authenticate<F>(
        validator: &dyn AccessTokenValidator,
        authorization: Option<&str>,
        f: F,
    ) -> Result<F::Output, AuthError>
    where
        F: Future,
    {
        let identity = Self::validate_header(validator, authorization)?;
        Ok(Self::scope(identity, f).await)
    }

    /// Synchronous variant of [`LoggedUser::authenticate`]
    pub fn sync_authenticate<F, R>(
        validator: &dyn AccessTokenValidator,
        authorization: Option<&str>,
        f: F,
    ) -> Result<R, AuthError>
    where
        F: FnOnce() -> R,
    {
        let identity = Self::validate_header(validator, authorization)?;
        Ok(Self::sync_scope(identity, f))
    }

    /// The identity of the user making the current request
    pub fn current_user() -> Result<Identity, AuthError> {
        LOGGED_USER
            .try_with(Identity::clone)
            .map_err(|_| AuthError::Unauthenticated)
    }

    pub fn current_user_id() -> Result<String, AuthError> {
        LOGGED_USER
            .try_with(|identity| identity.user_id.clone())
            .map_err(|_| AuthError::Unauthenticated)
    }

    pub fn is_bound() -> bool {
        LOGGED_USER.try_with(|_| ()).is_ok()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// The scheme is matched case-insensitively. Empty tokens are rejected.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    Some(token)
}
