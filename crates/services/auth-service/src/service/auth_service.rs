//! Authentication orchestrator - registration, login, federated login,
//! refresh and logout over one credential store.
//!
//! Every operation that touches storage runs in a single transaction:
//! committed on success, rolled back on any error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::client::{IdentityVerifier, VerifiedIdentity};
use crate::repository::{CredentialStore, CredentialTx};
use crate::service::hasher::CredentialHasher;
use crate::service::token_service::{AccessClaims, TokenService};
use common::{AppError, AppResult, OptionExt};
use domain::{Credentials, RefreshToken, User, UserResponse};

/// Well-formed Argon2id hash that matches no password. Verified against when
/// the account does not exist so both paths cost the same.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Token pair plus the user summary returned by every successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

/// Authentication use cases.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a LOCAL account and log it in. The name is stored trimmed.
    async fn register(&self, email: &str, name: &str, password: &str) -> AppResult<AuthResponse>;

    /// Password login for LOCAL accounts.
    async fn login(&self, email: &str, password: &str) -> AppResult<AuthResponse>;

    /// Login with a Google ID token, creating the account on first use.
    async fn login_with_google(&self, identity_token: &str) -> AppResult<AuthResponse>;

    /// New access token for a stored refresh token. The refresh token is
    /// returned unchanged.
    async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse>;

    /// Revoke one refresh token. Unknown tokens are ignored.
    async fn logout(&self, refresh_token: &str) -> AppResult<()>;

    /// Profile of the account identified by an access token subject.
    async fn current_user(&self, email: &str) -> AppResult<UserResponse>;

    /// Claims of a valid access token.
    fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims>;
}

enum RefreshOutcome {
    Renewed(AuthResponse),
    /// Expired row was deleted; the deletion must be committed
    Expired,
}

/// [`AuthService`] over a [`CredentialStore`].
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn CredentialHasher>,
    verifier: Arc<dyn IdentityVerifier>,
    tokens: Arc<TokenService>,
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn CredentialHasher>,
        verifier: Arc<dyn IdentityVerifier>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            hasher,
            verifier,
            tokens,
        }
    }

    /// Mint a token pair and make the new refresh token the user's only one.
    async fn issue_tokens(
        &self,
        tx: &mut dyn CredentialTx,
        user: &User,
    ) -> AppResult<AuthResponse> {
        let access_token = self.tokens.issue_access_token(user)?;
        let refresh_token = self.tokens.issue_refresh_token(user)?;

        let replaced = tx.delete_refresh_tokens_for_user(user.id).await?;
        tx.insert_refresh_token(&refresh_token, user.id, RefreshToken::expiry_from(Utc::now()))
            .await?;
        debug!(user_id = %user.id, replaced, "Issued token pair");

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: UserResponse::from(user),
        })
    }

    async fn register_in(
        &self,
        tx: &mut dyn CredentialTx,
        email: &str,
        name: &str,
        password: &str,
    ) -> AppResult<AuthResponse> {
        if tx.email_exists(email).await? {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = User::new_local(email.to_string(), name.to_string(), password_hash);
        tx.insert_user(&user).await?;
        info!(user_id = %user.id, "Registered local user");

        self.issue_tokens(tx, &user).await
    }

    async fn login_in(
        &self,
        tx: &mut dyn CredentialTx,
        email: &str,
        password: &str,
    ) -> AppResult<AuthResponse> {
        let Some(user) = tx.find_user_by_email(email).await? else {
            self.hasher.verify(password, DUMMY_HASH);
            warn!("Login rejected: unknown email");
            return Err(AppError::invalid_credentials());
        };

        let password_hash = match &user.credentials {
            Credentials::Local { password_hash } => password_hash,
            Credentials::Google { .. } => {
                warn!(user_id = %user.id, "Password login attempted on Google account");
                return Err(AppError::use_google_login());
            }
        };

        if !self.hasher.verify(password, password_hash) {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::invalid_credentials());
        }

        self.issue_tokens(tx, &user).await
    }

    async fn google_login_in(
        &self,
        tx: &mut dyn CredentialTx,
        identity: VerifiedIdentity,
    ) -> AppResult<AuthResponse> {
        let user = match tx.find_user_by_email(&identity.email).await? {
            Some(existing) => {
                if existing.is_local() {
                    info!(user_id = %existing.id, "Google login for existing local account");
                }
                existing
            }
            None => match tx.find_user_by_google_id(&identity.subject).await? {
                Some(linked) => {
                    info!(user_id = %linked.id, "Google login for account linked under another email");
                    linked
                }
                None => register_google(tx, identity).await?,
            },
        };

        self.issue_tokens(tx, &user).await
    }

    async fn refresh_in(
        &self,
        tx: &mut dyn CredentialTx,
        token: &str,
    ) -> AppResult<RefreshOutcome> {
        let stored = tx.find_refresh_token(token).await?.ok_or_invalid_refresh()?;

        if stored.is_expired() {
            tx.delete_refresh_token(&stored.token).await?;
            debug!(user_id = %stored.user_id, "Removed expired refresh token");
            return Ok(RefreshOutcome::Expired);
        }

        let user = tx
            .find_user_by_id(stored.user_id)
            .await?
            .ok_or_invalid_refresh()?;
        let access_token = self.tokens.issue_access_token(&user)?;

        Ok(RefreshOutcome::Renewed(AuthResponse {
            access_token,
            refresh_token: stored.token,
            user: UserResponse::from(user),
        }))
    }
}

/// Commit on success, roll back on error. The operation's error wins.
async fn finish<T>(tx: Box<dyn CredentialTx>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(e)
        }
    }
}

/// Create the account for a first Google login. A concurrent first login
/// for the same identity may win the insert; its committed row is used then.
async fn register_google(tx: &mut dyn CredentialTx, identity: VerifiedIdentity) -> AppResult<User> {
    let name = display_name(&identity);
    let user = User::new_google(
        identity.email.clone(),
        name,
        identity.subject.clone(),
        identity.picture,
    );

    match tx.insert_user(&user).await {
        Ok(()) => {
            info!(user_id = %user.id, "Registered Google user");
            Ok(user)
        }
        Err(e @ (AppError::DuplicateEmail | AppError::DuplicateGoogleAccount)) => {
            let winner = match tx.find_user_by_email(&identity.email).await? {
                Some(existing) => Some(existing),
                None => tx.find_user_by_google_id(&identity.subject).await?,
            };
            match winner {
                Some(existing) => {
                    debug!(user_id = %existing.id, "Google account created concurrently");
                    Ok(existing)
                }
                None => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Provider-supplied name, or the local part of the email.
fn display_name(identity: &VerifiedIdentity) -> String {
    identity
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(&self, email: &str, name: &str, password: &str) -> AppResult<AuthResponse> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Name must not be blank"));
        }

        let mut tx = self.store.begin().await?;
        let result = self.register_in(tx.as_mut(), email, name, password).await;
        finish(tx, result).await
    }

    async fn login(&self, email: &str, password: &str) -> AppResult<AuthResponse> {
        let mut tx = self.store.begin().await?;
        let result = self.login_in(tx.as_mut(), email, password).await;
        finish(tx, result).await
    }

    async fn login_with_google(&self, identity_token: &str) -> AppResult<AuthResponse> {
        // Verified before any transaction is opened.
        let identity = self
            .verifier
            .verify(identity_token)
            .await?
            .ok_or(AppError::InvalidFederatedToken)?;

        if !identity.email_verified {
            warn!("Google login rejected: email not verified");
            return Err(AppError::EmailNotVerified);
        }

        let mut tx = self.store.begin().await?;
        let result = self.google_login_in(tx.as_mut(), identity).await;
        finish(tx, result).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let mut tx = self.store.begin().await?;
        let result = self.refresh_in(tx.as_mut(), refresh_token).await;

        match finish(tx, result).await? {
            RefreshOutcome::Renewed(response) => Ok(response),
            RefreshOutcome::Expired => Err(AppError::RefreshTokenExpired),
        }
    }

    async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let result = tx.delete_refresh_token(refresh_token).await;
        let removed = finish(tx, result).await?;
        debug!(removed, "Logout");
        Ok(())
    }

    async fn current_user(&self, email: &str) -> AppResult<UserResponse> {
        let mut tx = self.store.begin().await?;
        let result = tx.find_user_by_email(email).await;
        let user = finish(tx, result).await?.ok_or_unauthorized()?;
        Ok(UserResponse::from(user))
    }

    fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        self.tokens.decode_access_claims(token)
    }
}
