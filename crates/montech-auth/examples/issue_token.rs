//! Issue an access token and verify it with the same settings
//!
//! Usage:
//!   cargo run --example issue_token -- --signing-key "your-secret" --user-id "u1"
//!   JWT_SIGNING_KEY=secret cargo run --example issue_token -- --user-id u1 --claim role=admin

use anyhow::{bail, Context, Result};
use clap::Parser;
use montech_auth::{
    AccessTokenGenerator, AccessTokenValidator, Identity, JwtSettings, JwtTokenGenerator,
    JwtTokenValidator, SigningAlgorithm, SigningConfig,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "issue_token")]
#[command(about = "Issue a signed access token", long_about = None)]
struct Args {
    /// HMAC signing key (must match the API's key)
    #[arg(long, env = "JWT_SIGNING_KEY")]
    signing_key: String,

    /// Token lifetime in minutes
    #[arg(long, env = "JWT_EXPIRATION_MINUTES", default_value = "60")]
    expiration_minutes: u32,

    /// Signing algorithm (HS256, HS384, HS512)
    #[arg(long, env = "JWT_ALGORITHM", default_value = "HS256")]
    algorithm: String,

    /// User ID to embed as the token subject
    #[arg(long)]
    user_id: String,

    /// Extra claim as key=value (repeatable)
    #[arg(long = "claim")]
    claims: Vec<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_claim(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("Invalid claim '{}', expected key=value", raw),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let algorithm: SigningAlgorithm = args.algorithm.parse()?;
    let signing = Arc::new(
        SigningConfig::load(&JwtSettings {
            signing_key: Some(args.signing_key),
            expiration_minutes: Some(args.expiration_minutes),
            algorithm,
        })
        .context("Invalid JWT settings")?,
    );

    let claims = args
        .claims
        .iter()
        .map(|raw| parse_claim(raw))
        .collect::<Result<Vec<_>>>()?;
    let identity = Identity::new(args.user_id).with_claims(claims);

    let generator = JwtTokenGenerator::new(signing.clone());
    let validator = JwtTokenValidator::new(signing);

    let token = generator.generate(&identity)?;
    let verified = validator.validate(&token.encoded_value)?;
    info!("Token verified for user {}", verified.user_id);

    println!("User ID:    {}", identity.user_id);
    println!("Issued at:  {}", token.issued_at);
    println!("Expires at: {}", token.expires_at);
    println!("\nToken:\n{}\n", token.encoded_value);
    println!("Usage:\n  curl -H \"Authorization: {}\" ...", token.bearer_header());

    Ok(())
}
