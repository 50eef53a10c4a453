//! Token service - mints and validates signed access/refresh tokens.
//!
//! Tokens are HS256 JWTs signed with one shared secret. Nothing here touches
//! storage: an access token is trusted on its signature and expiry alone.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{AppError, AppResult, JwtConfig};
use domain::{AuthProvider, User};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// User email
    pub sub: String,
    pub user_id: Uuid,
    pub provider: AuthProvider,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User email
    pub sub: String,
    /// Random id so that two tokens minted in the same second never collide
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Minimal view used by `validate` and `extract_subject`; accepts both kinds.
#[derive(Debug, Deserialize)]
struct SubjectClaims {
    sub: String,
}

/// Signing secret and lifetimes, fixed at construction.
#[derive(Clone)]
pub struct TokenSettings {
    secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }
}

/// Out-of-range lifetimes saturate; issuing then fails instead of panicking.
impl From<&JwtConfig> for TokenSettings {
    fn from(config: &JwtConfig) -> Self {
        Self::new(
            config.secret.clone(),
            Duration::try_minutes(config.access_expiration_minutes).unwrap_or(Duration::MAX),
            Duration::try_days(config.refresh_expiration_days).unwrap_or(Duration::MAX),
        )
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> AppResult<i64> {
    now.checked_add_signed(ttl)
        .map(|exp| exp.timestamp())
        .ok_or_else(|| AppError::internal("token lifetime overflows the clock"))
}

/// Issues and checks JWTs.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(settings: TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; no clock-skew allowance.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
        }
    }

    /// Short-lived token with subject, user id and provider claims.
    pub fn issue_access_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.email.clone(),
            user_id: user.id,
            provider: user.provider(),
            iat: now.timestamp(),
            exp: expiry_after(now, self.access_ttl)?,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Long-lived token with the subject only (plus a random `jti`).
    pub fn issue_refresh_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user.email.clone(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expiry_after(now, self.refresh_ttl)?,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// True iff the signature verifies and the token is unexpired.
    pub fn validate(&self, token: &str) -> bool {
        decode::<SubjectClaims>(token, &self.decoding_key, &self.validation).is_ok()
    }

    /// Embedded subject (email) of a valid token.
    ///
    /// # Errors
    /// `AppError::TokenInvalid` on a bad signature, malformed input or expiry.
    pub fn extract_subject(&self, token: &str) -> AppResult<String> {
        decode::<SubjectClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|_| AppError::TokenInvalid)
    }

    /// Full claims of a valid access token. Refresh tokens are rejected.
    pub fn decode_access_claims(&self, token: &str) -> AppResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::TokenInvalid)
    }
}
