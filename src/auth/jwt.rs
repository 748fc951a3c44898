use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::AppError;

/// Access tokens are always HMAC-SHA256 signed.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: Some(subject.to_string()),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Why a token could not be issued or accepted. Callers outside this module
/// only ever see "could not validate credentials" for the rejection cases.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT_SECRET is not set")]
    MissingSecret,
    #[error("token encoding failed: {0}")]
    Encode(String),
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has no subject claim")]
    MissingSubject,
    #[error("token has expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret => AppError::Configuration(err.to_string()),
            TokenError::Encode(msg) => AppError::Internal(msg),
            TokenError::Malformed
            | TokenError::BadSignature
            | TokenError::MissingSubject
            | TokenError::Expired => AppError::invalid_credentials(),
        }
    }
}

fn require_secret(config: &JwtConfig) -> Result<&[u8], TokenError> {
    config
        .secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::as_bytes)
        .ok_or(TokenError::MissingSecret)
}

/// Sign a token for `subject` that expires `ttl` from now.
pub fn issue_token(config: &JwtConfig, subject: &str, ttl: Duration) -> Result<String, TokenError> {
    let secret = require_secret(config)?;
    let claims = Claims::new(subject, ttl);

    encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| TokenError::Encode(e.to_string()))
}

/// Verify signature and expiry, returning the subject claim.
pub fn validate_token(config: &JwtConfig, token: &str) -> Result<String, TokenError> {
    let secret = require_secret(config)?;

    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map_err(
        |e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        },
    )?;

    match data.claims.sub {
        Some(sub) if !sub.is_empty() => Ok(sub),
        _ => Err(TokenError::MissingSubject),
    }
}
