//! JWT settings and the signing key store
//!
//! `Settings` is the raw, user-facing configuration (JSON file or environment).
//! `SigningConfig` is the validated, immutable form handed to the token
//! generator and validator. It is loaded once at startup and shared via `Arc`.

use chrono::Duration;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable holding the HMAC signing key
pub const ENV_SIGNING_KEY: &str = "JWT_SIGNING_KEY";
/// Environment variable holding the token lifetime in minutes
pub const ENV_EXPIRATION_MINUTES: &str = "JWT_EXPIRATION_MINUTES";
/// Environment variable holding the signing algorithm name
pub const ENV_ALGORITHM: &str = "JWT_ALGORITHM";

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("JWT signing key is missing or empty")]
    MissingSigningKey,

    #[error("JWT expiration minutes is missing")]
    MissingExpiration,

    #[error("JWT expiration minutes must be greater than zero")]
    ZeroExpiration,

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// HMAC algorithm used to sign access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    #[default]
    #[serde(rename = "HS256")]
    Hs256,
    #[serde(rename = "HS384")]
    Hs384,
    #[serde(rename = "HS512")]
    Hs512,
}

impl SigningAlgorithm {
    pub fn as_jwt_algorithm(self) -> Algorithm {
        match self {
            SigningAlgorithm::Hs256 => Algorithm::HS256,
            SigningAlgorithm::Hs384 => Algorithm::HS384,
            SigningAlgorithm::Hs512 => Algorithm::HS512,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SigningAlgorithm::Hs256 => "HS256",
            SigningAlgorithm::Hs384 => "HS384",
            SigningAlgorithm::Hs512 => "HS512",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(SigningAlgorithm::Hs256),
            "HS384" => Ok(SigningAlgorithm::Hs384),
            "HS512" => Ok(SigningAlgorithm::Hs512),
            other => Err(ConfigurationError::InvalidValue {
                key: "jwt.algorithm".to_string(),
                reason: format!("unsupported algorithm '{}'", other),
            }),
        }
    }
}

/// Top-level application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub jwt: JwtSettings,
}

/// Raw `jwt` section, before validation
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtSettings {
    pub signing_key: Option<String>,
    pub expiration_minutes: Option<u32>,
    #[serde(default)]
    pub algorithm: SigningAlgorithm,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field(
                "signing_key",
                &self.signing_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiration_minutes", &self.expiration_minutes)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl Settings {
    /// Parse settings from a JSON document
    ///
    /// ```
    /// use montech_auth::Settings;
    ///
    /// let settings = Settings::from_json_str(
    ///     r#"{ "jwt": { "signingKey": "s3cret", "expirationMinutes": 30 } }"#,
    /// ).unwrap();
    /// assert_eq!(settings.jwt.expiration_minutes, Some(30));
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file on disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loaded settings from {:?}", path);
        Self::from_json_str(&json)
    }

    /// Load settings from `JWT_*` environment variables
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup (environment-shaped)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expiration_minutes = match lookup(ENV_EXPIRATION_MINUTES) {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|e| {
                ConfigurationError::InvalidValue {
                    key: ENV_EXPIRATION_MINUTES.to_string(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let algorithm = match lookup(ENV_ALGORITHM) {
            Some(raw) => raw.parse()?,
            None => SigningAlgorithm::default(),
        };

        Ok(Self {
            jwt: JwtSettings {
                signing_key: lookup(ENV_SIGNING_KEY),
                expiration_minutes,
                algorithm,
            },
        })
    }
}

/// Validated signing material and expiration policy
///
/// Immutable once loaded.
#[derive(Clone)]
pub struct SigningConfig {
    signing_key: Vec<u8>,
    expiration_minutes: u32,
    algorithm: SigningAlgorithm,
}

impl SigningConfig {
    /// Validate raw settings into a signing config
    pub fn load(settings: &JwtSettings) -> Result<Self, ConfigurationError> {
        let signing_key = settings
            .signing_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigurationError::MissingSigningKey)?;

        let expiration_minutes = settings
            .expiration_minutes
            .ok_or(ConfigurationError::MissingExpiration)?;

        let config = Self::new(signing_key.as_bytes(), expiration_minutes, settings.algorithm)?;

        info!(
            "JWT signing configured: algorithm={}, expiration={}m",
            config.algorithm, config.expiration_minutes
        );

        Ok(config)
    }

    pub fn new(
        signing_key: &[u8],
        expiration_minutes: u32,
        algorithm: SigningAlgorithm,
    ) -> Result<Self, ConfigurationError> {
        if signing_key.is_empty() {
            return Err(ConfigurationError::MissingSigningKey);
        }
        if expiration_minutes == 0 {
            return Err(ConfigurationError::ZeroExpiration);
        }

        Ok(Self {
            signing_key: signing_key.to_vec(),
            expiration_minutes,
            algorithm,
        })
    }

    pub fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }

    pub fn expiration_minutes(&self) -> u32 {
        self.expiration_minutes
    }

    pub fn expiration(&self) -> Duration {
        Duration::minutes(i64::from(self.expiration_minutes))
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("signing_key", &"[REDACTED]")
            .field("expiration_minutes", &self.expiration_minutes)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn jwt_settings(key: Option<&str>, minutes: Option<u32>) -> JwtSettings {
        JwtSettings {
            signing_key: key.map(str::to_string),
            expiration_minutes: minutes,
            algorithm: SigningAlgorithm::default(),
        }
    }

    #[test]
    fn test_load_valid_settings() {
        let config = SigningConfig::load(&jwt_settings(Some("secret"), Some(30))).unwrap();

        assert_eq!(config.signing_key(), b"secret");
        assert_eq!(config.expiration_minutes(), 30);
        assert_eq!(config.expiration(), Duration::minutes(30));
        assert_eq!(config.algorithm(), SigningAlgorithm::Hs256);
    }

    #[test]
    fn test_load_rejects_missing_key() {
        let result = SigningConfig::load(&jwt_settings(None, Some(30)));
        assert!(matches!(result, Err(ConfigurationError::MissingSigningKey)));
    }

    #[test]
    fn test_load_rejects_empty_key() {
        let result = SigningConfig::load(&jwt_settings(Some(""), Some(30)));
        assert!(matches!(result, Err(ConfigurationError::MissingSigningKey)));
    }

    #[test]
    fn test_load_rejects_zero_expiration() {
        let result = SigningConfig::load(&jwt_settings(Some("secret"), Some(0)));
        assert!(matches!(result, Err(ConfigurationError::ZeroExpiration)));
    }

    #[test]
    fn test_load_rejects_missing_expiration() {
        let result = SigningConfig::load(&jwt_settings(Some("secret"), None));
        assert!(matches!(result, Err(ConfigurationError::MissingExpiration)));
    }

    #[test]
    fn test_settings_from_json() {
        let settings = Settings::from_json_str(
            r#"{ "jwt": { "signingKey": "abc", "expirationMinutes": 15, "algorithm": "HS512" } }"#,
        )
        .unwrap();

        assert_eq!(settings.jwt.signing_key.as_deref(), Some("abc"));
        assert_eq!(settings.jwt.expiration_minutes, Some(15));
        assert_eq!(settings.jwt.algorithm, SigningAlgorithm::Hs512);
    }

    #[test]
    fn test_settings_from_json_defaults_algorithm() {
        let settings = Settings::from_json_str(r#"{ "jwt": { "signingKey": "abc" } }"#).unwrap();
        assert_eq!(settings.jwt.algorithm, SigningAlgorithm::Hs256);
        assert_eq!(settings.jwt.expiration_minutes, None);
    }

    #[test]
    fn test_settings_from_json_rejects_negative_expiration() {
        let result = Settings::from_json_str(r#"{ "jwt": { "expirationMinutes": -5 } }"#);
        assert!(matches!(result, Err(ConfigurationError::Parse(_))));
    }

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_SIGNING_KEY, "env-secret"),
            (ENV_EXPIRATION_MINUTES, " 45 "),
            (ENV_ALGORITHM, "hs384"),
        ]);

        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(settings.jwt.signing_key.as_deref(), Some("env-secret"));
        assert_eq!(settings.jwt.expiration_minutes, Some(45));
        assert_eq!(settings.jwt.algorithm, SigningAlgorithm::Hs384);
    }

    #[test]
    fn test_settings_from_lookup_rejects_garbage_expiration() {
        let result = Settings::from_lookup(|k| {
            (k == ENV_EXPIRATION_MINUTES).then(|| "soon".to_string())
        });

        match result {
            Err(ConfigurationError::InvalidValue { key, .. }) => {
                assert_eq!(key, ENV_EXPIRATION_MINUTES)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_algorithm() {
        assert!("RS256".parse::<SigningAlgorithm>().is_err());
        assert_eq!(
            "HS256".parse::<SigningAlgorithm>().unwrap(),
            SigningAlgorithm::Hs256
        );
    }

    #[test]
    fn test_from_file_missing() {
        let result = Settings::from_file("/definitely/not/here/appsettings.json");
        assert!(matches!(result, Err(ConfigurationError::Read { .. })));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = SigningConfig::new(b"super-secret", 10, SigningAlgorithm::Hs256).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));

        let settings = jwt_settings(Some("super-secret"), Some(10));
        assert!(!format!("{:?}", settings).contains("super-secret"));
    }
}
