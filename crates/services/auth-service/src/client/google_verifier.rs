//! Google ID token verification via the `tokeninfo` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use common::{AppError, AppResult, GoogleConfig};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Issuers Google uses for ID tokens.
const GOOGLE_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Claims of an identity token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider subject id
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Third-party identity token verifier.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `id_token` against the configured audience.
    ///
    /// Returns `Ok(None)` when the provider rejects the token and an error
    /// only when the provider could not be asked.
    async fn verify(&self, id_token: &str) -> AppResult<Option<VerifiedIdentity>>;
}

/// Verifier that asks Google's `tokeninfo` endpoint.
pub struct GoogleTokenVerifier {
    http: reqwest::Client,
    tokeninfo_url: String,
    client_id: String,
}

impl GoogleTokenVerifier {
    pub fn new(config: &GoogleConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::internal(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            tokeninfo_url: config.tokeninfo_url.clone(),
            client_id: config.client_id.clone(),
        })
    }

    /// Check audience, issuer and expiry of a tokeninfo payload.
    fn identity_from_payload(&self, body: &Value) -> Option<VerifiedIdentity> {
        let audience = str_field(body, "aud");
        if audience.as_deref() != Some(self.client_id.as_str()) {
            warn!(
                token_audience = ?audience,
                "Google token audience mismatch"
            );
            return None;
        }

        match str_field(body, "iss") {
            Some(iss) if GOOGLE_ISSUERS.contains(&iss.as_str()) => {}
            other => {
                warn!(issuer = ?other, "Google token has unexpected issuer");
                return None;
            }
        }

        let now = Utc::now().timestamp();
        match i64_field(body, "exp") {
            Some(exp) if exp >= now => {}
            exp => {
                warn!(token_exp = ?exp, current_time = now, "Google token expired");
                return None;
            }
        }

        let (Some(subject), Some(email)) = (str_field(body, "sub"), str_field(body, "email"))
        else {
            warn!("Google token missing required fields (email/sub)");
            return None;
        };

        Some(VerifiedIdentity {
            subject,
            email,
            email_verified: bool_field(body, "email_verified").unwrap_or(false),
            name: str_field(body, "name"),
            picture: str_field(body, "picture"),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<Option<VerifiedIdentity>> {
        if self.client_id.is_empty() {
            return Err(AppError::internal("GOOGLE_CLIENT_ID is not configured"));
        }

        debug!("Validating Google ID token with tokeninfo endpoint");

        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AppError::service_unavailable(format!("google tokeninfo: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            warn!(http_status = %status, "Google rejected ID token");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::service_unavailable(format!(
                "google tokeninfo returned {}",
                status
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            AppError::service_unavailable(format!("google tokeninfo body: {}", e))
        })?;

        Ok(self.identity_from_payload(&body))
    }
}

fn str_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

/// tokeninfo encodes booleans as strings; accept both forms.
fn bool_field(body: &Value, key: &str) -> Option<bool> {
    match body.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// tokeninfo encodes numbers as strings; accept both forms.
fn i64_field(body: &Value, key: &str) -> Option<i64> {
    match body.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
