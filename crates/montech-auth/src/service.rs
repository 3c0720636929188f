//! Authentication service: composition root for the token components
//!
//! Loads the signing config once, shares it between one generator and one
//! validator, and pairs them with a user repository.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{Settings, SigningConfig};
use crate::error::AuthError;
use crate::generator::{AccessToken, AccessTokenGenerator, JwtTokenGenerator};
use crate::identity::Identity;
use crate::logged_user::{extract_bearer_token, LoggedUser};
use crate::repository::{Credential, UserRecord, UserRepository};
use crate::validator::{AccessTokenValidator, JwtTokenValidator};

/// Login, token validation and logged-user lookup
#[derive(Clone)]
pub struct AuthService {
    generator: Arc<dyn AccessTokenGenerator>,
    validator: Arc<dyn AccessTokenValidator>,
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    /// Build the JWT-backed service from settings
    ///
    /// Fails with a configuration error when the signing settings are invalid;
    /// the host must not start serving in that case.
    pub fn from_settings(
        settings: &Settings,
        users: Arc<dyn UserRepository>,
    ) -> Result<Self, AuthError> {
        Self::from_settings_with_clock(settings, users, Arc::new(SystemClock))
    }

    pub fn from_settings_with_clock(
        settings: &Settings,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let signing = Arc::new(SigningConfig::load(&settings.jwt)?);

        let generator = JwtTokenGenerator::new(signing.clone()).with_clock(clock.clone());
        let validator = JwtTokenValidator::new(signing).with_clock(clock);

        info!("Authentication service initialized");

        Ok(Self::new(Arc::new(generator), Arc::new(validator), users))
    }

    /// Assemble from arbitrary backends
    pub fn new(
        generator: Arc<dyn AccessTokenGenerator>,
        validator: Arc<dyn AccessTokenValidator>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            generator,
            validator,
            users,
        }
    }

    pub fn generator(&self) -> &Arc<dyn AccessTokenGenerator> {
        &self.generator
    }

    pub fn validator(&self) -> &Arc<dyn AccessTokenValidator> {
        &self.validator
    }

    /// Exchange a credential for an access token
    pub async fn login(&self, credential: &Credential) -> Result<AccessToken, AuthError> {
        let identity = self
            .users
            .find_user_by_credential(credential)
            .await?
            .ok_or_else(|| {
                warn!("Login failed for {}", credential.email);
                AuthError::InvalidCredentials
            })?;

        let token = self.generator.generate(&identity)?;
        info!("User {} logged in", identity.user_id);

        Ok(token)
    }

    /// Validate the bearer token carried in an `Authorization` header value
    pub fn authenticate_header(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let token = authorization
            .and_then(extract_bearer_token)
            .ok_or(AuthError::Unauthenticated)?;

        Ok(self.validator.validate(token)?)
    }

    /// Run `f` as the user identified by `authorization`
    pub async fn with_logged_user<F>(
        &self,
        authorization: Option<&str>,
        f: F,
    ) -> Result<F::Output, AuthError>
    where
        F: Future,
    {
        LoggedUser::authenticate(self.validator.as_ref(), authorization, f).await
    }

    /// Stored record of the logged user
    ///
    /// A user deleted after the token was issued counts as unauthenticated.
    pub async fn logged_user_record(&self) -> Result<UserRecord, AuthError> {
        let user_id = LoggedUser::current_user_id()?;

        match self.users.find_by_id(&user_id).await? {
            Some(record) if record.is_active => Ok(record),
            _ => {
                debug!("Logged user {} no longer present or active", user_id);
                Err(AuthError::Unauthenticated)
            }
        }
    }
}
