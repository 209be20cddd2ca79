//! Authentication utilities
//!
//! Password hashing, token minting, and the [`IdentityResolver`] the
//! WebSocket handshake uses to turn a bearer token into a user id.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use motchi_api::{AccessTokenClaims, RefreshTokenClaims};
use motchi_core::{CoreError, IdentityResolver, UserId};

use crate::error::ServerResult;

/// Hash a plaintext password
pub fn hash_password(password: &str) -> ServerResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> ServerResult<bool> {
    let parsed_hash = PasswordHash::new(hash)?;
    let argon2 = Argon2::default();

    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate an access token
pub fn generate_access_token(
    user_id: UserId,
    encoding_key: &EncodingKey,
    ttl_seconds: u64,
) -> ServerResult<String> {
    let now = chrono::Utc::now().timestamp();

    let claims = AccessTokenClaims {
        sub: user_id,
        iat: now,
        exp: now + ttl_seconds as i64,
        jti: uuid::Uuid::new_v4(),
        token_type: "access".to_string(),
    };

    Ok(encode(&Header::default(), &claims, encoding_key)?)
}

/// Generate a refresh token
pub fn generate_refresh_token(
    user_id: UserId,
    family: uuid::Uuid,
    encoding_key: &EncodingKey,
    ttl_seconds: u64,
) -> ServerResult<String> {
    let now = chrono::Utc::now().timestamp();

    let claims = RefreshTokenClaims {
        sub: user_id,
        iat: now,
        exp: now + ttl_seconds as i64,
        jti: uuid::Uuid::new_v4(),
        token_type: "refresh".to_string(),
        family,
    };

    Ok(encode(&Header::default(), &claims, encoding_key)?)
}

/// Validate an access token
pub fn validate_access_token(
    token: &str,
    decoding_key: &DecodingKey,
) -> ServerResult<AccessTokenClaims> {
    let token_data = decode::<AccessTokenClaims>(token, decoding_key, &Validation::default())?;
    if token_data.claims.token_type != "access" {
        return Err(jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::InvalidToken,
        )
        .into());
    }
    Ok(token_data.claims)
}

/// Validate a refresh token
pub fn validate_refresh_token(
    token: &str,
    decoding_key: &DecodingKey,
) -> ServerResult<RefreshTokenClaims> {
    let token_data = decode::<RefreshTokenClaims>(token, decoding_key, &Validation::default())?;
    if token_data.claims.token_type != "refresh" {
        return Err(jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::InvalidToken,
        )
        .into());
    }
    Ok(token_data.claims)
}

/// Resolves credentials by validating signed access tokens
#[derive(Clone)]
pub struct JwtIdentityResolver {
    decoding_key: Arc<DecodingKey>,
}

impl JwtIdentityResolver {
    pub fn new(decoding_key: DecodingKey) -> Self {
        Self {
            decoding_key: Arc::new(decoding_key),
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, credential: &str) -> motchi_core::Result<UserId> {
        let claims = validate_access_token(credential, &self.decoding_key)
            .map_err(|_| CoreError::unauthorized("Invalid or expired token"))?;
        Ok(claims.sub)
    }
}
