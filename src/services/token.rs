use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm as JwtAlgorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::User;
use crate::utils::generate_random_id;

/// Access tokens live for a work shift.
pub const ACCESS_TOKEN_TTL_HOURS: i64 = 8;
/// Locally issued refresh material shares the session's absolute lifetime.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 14;

/// Claims carried by every locally signed token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub provider: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl AccessClaims {
    pub fn from_user(user: &User, ttl: Duration) -> Self {
        let now = Utc::now();
        AccessClaims {
            sub: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            provider: user.provider.clone(),
            role: user.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: generate_random_id(),
        }
    }
}

/// Signs and verifies HS256 tokens with a key derived from the configured
/// secret and salt rather than the raw secret itself.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    /// Derive the signing key with argon2id (64 MiB, 1 pass, 4 lanes,
    /// 32-byte output) and build the HS256 key pair from it.
    pub fn new(secret: &str, salt: &str) -> Result<Self, anyhow::Error> {
        let params = Params::new(64 * 1024, 1, 4, Some(32))
            .map_err(|e| anyhow::anyhow!("invalid kdf params: {e}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut key)
            .map_err(|e| anyhow::anyhow!("failed to derive signing key: {e}"))?;

        Ok(TokenIssuer {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
        })
    }

    /// Short-lived access token for API calls.
    pub fn issue_access_token(&self, user: &User) -> Result<String, anyhow::Error> {
        self.issue_access_token_with_ttl(user, Duration::hours(ACCESS_TOKEN_TTL_HOURS))
    }

    /// Access token with a caller-chosen validity window, used when a
    /// federated provider dictates the lifetime.
    pub fn issue_access_token_with_ttl(
        &self,
        user: &User,
        ttl: Duration,
    ) -> Result<String, anyhow::Error> {
        self.sign(AccessClaims::from_user(user, ttl))
    }

    /// Long-lived refresh material for sessions on the local provider.
    pub fn issue_refresh_token(&self, user: &User) -> Result<String, anyhow::Error> {
        self.sign(AccessClaims::from_user(
            user,
            Duration::days(REFRESH_TOKEN_TTL_DAYS),
        ))
    }

    fn sign(&self, claims: AccessClaims) -> Result<String, anyhow::Error> {
        encode(&Header::new(JwtAlgorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("failed to sign token: {e}"))
    }

    /// Verify signature and expiry. The raw jsonwebtoken error is returned
    /// so callers can distinguish `ExpiredSignature` from everything else.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(JwtAlgorithm::HS256);
        decode::<AccessClaims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}
