//! End-to-end token flow: issue, present, validate, expose as logged user

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use montech_auth::{
    AccessTokenGenerator, AccessTokenValidator, AuthError, AuthService, Credential, Identity,
    InMemoryUserRepository, JwtTokenGenerator, JwtTokenValidator, LoggedUser, ManualClock,
    Settings, SigningAlgorithm, SigningConfig, UserRole, ValidationError,
};
use std::sync::Arc;

/// Generator and validator sharing one key and one manual clock
fn pair(
    key: &[u8],
    minutes: u32,
    clock: &Arc<ManualClock>,
) -> (JwtTokenGenerator, JwtTokenValidator) {
    let config = Arc::new(SigningConfig::new(key, minutes, SigningAlgorithm::Hs256).unwrap());
    (
        JwtTokenGenerator::new(config.clone()).with_clock(clock.clone()),
        JwtTokenValidator::new(config).with_clock(clock.clone()),
    )
}

fn fixed_start() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_760_000_000, 0).unwrap()
}

#[test]
fn test_validate_returns_generated_identity() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (generator, validator) = pair(b"flow-key", 30, &clock);

    let identities = [
        Identity::new("u1"),
        Identity::new("0b7c1f0e-9a55-4a43-a4d8-4c1b0c9e7d11")
            .with_claim("email", "ana@montech.dev")
            .with_claim("role", "admin"),
        Identity::new("ünïcødé-user").with_claim("name", "José da Silva"),
    ];

    for identity in identities {
        let token = generator.generate(&identity).unwrap();
        assert_eq!(validator.validate(&token.encoded_value), Ok(identity));
    }
}

#[test]
fn test_thirty_minute_scenario() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (generator, validator) = pair(b"flow-key", 30, &clock);

    let token = generator.generate(&Identity::new("u1")).unwrap();
    assert_eq!(token.expires_at, token.issued_at + Duration::minutes(30));

    clock.set(token.issued_at + Duration::minutes(10));
    let identity = validator.validate(&token.encoded_value).unwrap();
    assert_eq!(identity.user_id, "u1");

    clock.set(token.issued_at + Duration::minutes(31));
    assert_eq!(
        validator.validate(&token.encoded_value),
        Err(ValidationError::Expired)
    );
}

#[test]
fn test_expiry_boundary() {
    for minutes in [1u32, 7, 60, 24 * 60] {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let (generator, validator) = pair(b"flow-key", minutes, &clock);
        let token = generator.generate(&Identity::new("u1")).unwrap();
        let bound = token.issued_at + Duration::minutes(i64::from(minutes));

        clock.set(bound - Duration::seconds(1));
        assert!(validator.validate(&token.encoded_value).is_ok());

        clock.set(bound - Duration::nanoseconds(1));
        assert!(validator.validate(&token.encoded_value).is_ok());

        clock.set(bound);
        assert_eq!(
            validator.validate(&token.encoded_value),
            Err(ValidationError::Expired)
        );

        clock.set(bound + Duration::days(3));
        assert_eq!(
            validator.validate(&token.encoded_value),
            Err(ValidationError::Expired)
        );
    }
}

#[test]
fn test_every_signature_bit_flip_is_rejected() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (generator, validator) = pair(b"flow-key", 30, &clock);
    let token = generator.generate(&Identity::new("u1")).unwrap();

    let (message, signature) = token.encoded_value.rsplit_once('.').unwrap();
    let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();

    for bit in 0..signature.len() * 8 {
        let mut mutated = signature.clone();
        mutated[bit / 8] ^= 1 << (bit % 8);
        let forged = format!("{}.{}", message, URL_SAFE_NO_PAD.encode(&mutated));

        assert_eq!(
            validator.validate(&forged),
            Err(ValidationError::InvalidSignature),
            "bit {} flip was accepted",
            bit
        );
    }
}

#[test]
fn test_tampered_payload_is_rejected() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (generator, validator) = pair(b"flow-key", 30, &clock);
    let token = generator.generate(&Identity::new("u1")).unwrap();

    let parts: Vec<&str> = token.encoded_value.split('.').collect();
    let mut payload: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    payload["sub"] = serde_json::Value::String("admin".to_string());
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());

    let forged = format!("{}.{}.{}", parts[0], payload, parts[2]);
    assert_eq!(
        validator.validate(&forged),
        Err(ValidationError::InvalidSignature)
    );
}

#[test]
fn test_key_a_token_fails_under_key_b() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (generator_a, _) = pair(b"A", 30, &clock);
    let (_, validator_b) = pair(b"B", 30, &clock);

    let token = generator_a.generate(&Identity::new("u1")).unwrap();

    // Same answer every time
    for _ in 0..3 {
        assert_eq!(
            validator_b.validate(&token.encoded_value),
            Err(ValidationError::InvalidSignature)
        );
    }
}

#[test]
fn test_not_a_token_is_malformed() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (_, validator) = pair(b"flow-key", 30, &clock);

    assert_eq!(
        validator.validate("not-a-token"),
        Err(ValidationError::Malformed)
    );
}

#[test]
fn test_validate_is_idempotent() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (generator, validator) = pair(b"flow-key", 30, &clock);
    let token = generator
        .generate(&Identity::new("u1").with_claim("role", "user"))
        .unwrap();

    let results: Vec<_> = (0..5)
        .map(|_| validator.validate(&token.encoded_value))
        .collect();

    assert!(results[0].is_ok());
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_validator_shared_across_threads() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (generator, validator) = pair(b"flow-key", 30, &clock);
    let generator = Arc::new(generator);
    let validator = Arc::new(validator);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let generator = generator.clone();
            let validator = validator.clone();
            std::thread::spawn(move || {
                let identity = Identity::new(format!("user-{}", i));
                let token = generator.generate(&identity).unwrap();
                validator.validate(&token.encoded_value).unwrap() == identity
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[tokio::test]
async fn test_login_then_request_as_logged_user() {
    let users = Arc::new(InMemoryUserRepository::new());
    users
        .add_user(
            "ana@montech.dev",
            "Montech#2024",
            Some("Ana".to_string()),
            UserRole::Admin,
        )
        .await
        .unwrap();

    let settings = Settings::from_json_str(
        r#"{ "jwt": { "signingKey": "integration-key", "expirationMinutes": 30 } }"#,
    )
    .unwrap();
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let service =
        AuthService::from_settings_with_clock(&settings, users.clone(), clock.clone()).unwrap();

    let token = service
        .login(&Credential::new("ana@montech.dev", "Montech#2024"))
        .await
        .unwrap();

    // Request handler reading the logged user
    let header = token.bearer_header();
    let (identity, record) = service
        .with_logged_user(Some(&header), async {
            let identity = LoggedUser::current_user().unwrap();
            let record = service.logged_user_record().await.unwrap();
            (identity, record)
        })
        .await
        .unwrap();

    assert_eq!(identity.user_id, record.id.to_string());
    assert_eq!(identity.claim("role"), Some("admin"));
    assert_eq!(record.email, "ana@montech.dev");

    // Request scope ended
    assert!(matches!(
        LoggedUser::current_user(),
        Err(AuthError::Unauthenticated)
    ));

    // Same token after expiry
    clock.advance(Duration::minutes(30));
    let result = service
        .with_logged_user(Some(&header), async { LoggedUser::current_user() })
        .await;
    assert!(matches!(
        result,
        Err(AuthError::Validation(ValidationError::Expired))
    ));
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let users = Arc::new(InMemoryUserRepository::new());
    users
        .add_user("bob@montech.dev", "right", None, UserRole::User)
        .await
        .unwrap();

    let settings = Settings::from_json_str(
        r#"{ "jwt": { "signingKey": "integration-key", "expirationMinutes": 30 } }"#,
    )
    .unwrap();
    let service = AuthService::from_settings(&settings, users).unwrap();

    let result = service
        .login(&Credential::new("bob@montech.dev", "wrong"))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_forged_identity_never_becomes_logged_user() {
    let clock = Arc::new(ManualClock::new(fixed_start()));
    let (_, validator) = pair(b"server-key", 30, &clock);
    let (forger, _) = pair(b"attacker-key", 30, &clock);

    // Hand-built admin identity, signed with a key the server does not hold
    let forged = forger
        .generate(&Identity::new("admin").with_claim("role", "admin"))
        .unwrap();
    let header = forged.bearer_header();

    let result = LoggedUser::authenticate(&validator, Some(&header), async {
        LoggedUser::current_user()
    })
    .await;
    assert!(matches!(
        result,
        Err(AuthError::Validation(ValidationError::InvalidSignature))
    ));

    let mut handler_ran = false;
    let result = LoggedUser::sync_authenticate(&validator, Some(&header), || {
        handler_ran = true;
    });
    assert!(result.is_err());
    assert!(!handler_ran);
    assert!(!LoggedUser::is_bound());
}
