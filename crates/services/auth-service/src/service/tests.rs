use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::*;
use crate::client::{MockIdentityVerifier, VerifiedIdentity};
use crate::repository::{CredentialStore, CredentialTx, MemoryStore};
use common::{AppError, AppResult, INVALID_CREDENTIALS_MESSAGE, USE_GOOGLE_LOGIN_MESSAGE};
use domain::{AuthProvider, RefreshToken, User};

const SECRET: &str = "test-secret-key-for-testing-only-32chars";
const PASSWORD: &str = "CorrectHorse1";

fn tokens() -> Arc<TokenService> {
    Arc::new(TokenService::new(TokenSettings::new(
        SECRET,
        Duration::minutes(15),
        Duration::days(7),
    )))
}

fn authenticator_with(store: &MemoryStore, verifier: MockIdentityVerifier) -> Authenticator {
    Authenticator::new(
        Arc::new(store.clone()),
        Arc::new(Argon2Hasher),
        Arc::new(verifier),
        tokens(),
    )
}

/// Authenticator whose verifier must never be called.
fn authenticator(store: &MemoryStore) -> Authenticator {
    authenticator_with(store, MockIdentityVerifier::new())
}

fn google_identity(email: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        subject: "110169484474386276334".to_string(),
        email: email.to_string(),
        email_verified: true,
        name: Some("Grace Hopper".to_string()),
        picture: Some("https://lh3.googleusercontent.com/a/photo".to_string()),
    }
}

fn verifier_returning(identity: Option<VerifiedIdentity>) -> MockIdentityVerifier {
    let mut verifier = MockIdentityVerifier::new();
    verifier
        .expect_verify()
        .returning(move |_| Ok(identity.clone()));
    verifier
}

/// Store whose next transaction sees `rival` committed right before its
/// first user insert, as if a concurrent request had just won that race.
struct RacingStore {
    inner: MemoryStore,
    rival: Mutex<Option<User>>,
}

struct RacingTx {
    inner: Box<dyn CredentialTx>,
    rival: Option<User>,
}

#[async_trait]
impl CredentialStore for RacingStore {
    async fn begin(&self) -> AppResult<Box<dyn CredentialTx>> {
        let inner = self.inner.begin().await?;
        let rival = self.rival.lock().unwrap().take();
        Ok(Box::new(RacingTx { inner, rival }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CredentialTx for RacingTx {
    async fn find_user_by_id(&mut self, id: Uuid) -> AppResult<Option<User>> {
        self.inner.find_user_by_id(id).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_user_by_google_id(&mut self, google_id: &str) -> AppResult<Option<User>> {
        self.inner.find_user_by_google_id(google_id).await
    }

    async fn email_exists(&mut self, email: &str) -> AppResult<bool> {
        self.inner.email_exists(email).await
    }

    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        if let Some(rival) = self.rival.take() {
            self.inner.insert_user(&rival).await?;
        }
        self.inner.insert_user(user).await
    }

    async fn find_refresh_token(&mut self, token: &str) -> AppResult<Option<RefreshToken>> {
        self.inner.find_refresh_token(token).await
    }

    async fn delete_refresh_tokens_for_user(&mut self, user_id: Uuid) -> AppResult<u64> {
        self.inner.delete_refresh_tokens_for_user(user_id).await
    }

    async fn delete_refresh_token(&mut self, token: &str) -> AppResult<bool> {
        self.inner.delete_refresh_token(token).await
    }

    async fn insert_refresh_token(
        &mut self,
        token: &str,
        user_id: Uuid,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<RefreshToken> {
        self.inner.insert_refresh_token(token, user_id, expiry_date).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        this.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        this.inner.rollback().await
    }
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_creates_local_user_and_logs_in() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);

    let response = auth.register("ada@example.com", "Ada Lovelace", PASSWORD).await.unwrap();

    assert_eq!(response.user.email, "ada@example.com");
    assert_eq!(response.user.name, "Ada Lovelace");
    assert_eq!(response.user.provider, AuthProvider::Local);
    assert_eq!(
        response.user.profile_image_url.as_deref(),
        Some("https://ui-avatars.com/api/?name=Ada+Lovelace")
    );

    let stored = store.user_by_email("ada@example.com").await.unwrap();
    assert_ne!(stored.password_hash(), Some(PASSWORD));
    assert!(store.has_refresh_token(&response.refresh_token).await);

    let claims = auth.verify_access_token(&response.access_token).unwrap();
    assert_eq!(claims.sub, "ada@example.com");
    assert_eq!(claims.user_id, stored.id);
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    let result = auth.register("ada@example.com", "Other Ada", PASSWORD).await;

    assert!(matches!(result, Err(AppError::DuplicateEmail)));
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_register_blank_name_is_rejected_and_names_are_trimmed() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);

    let result = auth.register("ada@example.com", "   ", PASSWORD).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(store.user_count().await, 0);

    let response = auth.register("ada@example.com", "  Ada  ", PASSWORD).await.unwrap();
    assert_eq!(response.user.name, "Ada");
    assert_eq!(
        response.user.profile_image_url.as_deref(),
        Some("https://ui-avatars.com/api/?name=Ada")
    );
}

#[tokio::test]
async fn test_register_short_password_persists_nothing() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);

    let result = auth.register("ada@example.com", "Ada", "short").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(store.user_count().await, 0);
}

// =============================================================================
// Password login
// =============================================================================

#[tokio::test]
async fn test_login_with_correct_password() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    let response = auth.login("ada@example.com", PASSWORD).await.unwrap();

    assert_eq!(response.user.email, "ada@example.com");
    assert!(auth.verify_access_token(&response.access_token).is_ok());
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email_look_the_same() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    for (email, password) in [
        ("ada@example.com", "WrongHorse1"),
        ("nobody@example.com", PASSWORD),
    ] {
        match auth.login(email, password).await {
            Err(AppError::InvalidCredentials(message)) => {
                assert_eq!(message, INVALID_CREDENTIALS_MESSAGE)
            }
            other => panic!("unexpected result for {}: {:?}", email, other.map(|_| ())),
        }
    }
}

#[tokio::test]
async fn test_login_to_google_account_with_password_is_refused() {
    let store = MemoryStore::new();
    store
        .seed_user(User::new_google(
            "grace@example.com".to_string(),
            "Grace".to_string(),
            "sub-1".to_string(),
            None,
        ))
        .await;
    let auth = authenticator(&store);

    match auth.login("grace@example.com", PASSWORD).await {
        Err(AppError::InvalidCredentials(message)) => {
            assert_eq!(message, USE_GOOGLE_LOGIN_MESSAGE)
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_login_keeps_only_the_latest_refresh_token() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    let registered = auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    let first = auth.login("ada@example.com", PASSWORD).await.unwrap();
    let second = auth.login("ada@example.com", PASSWORD).await.unwrap();

    let user_id = registered.user.id;
    let remaining = store.refresh_tokens_for(user_id).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].token, second.refresh_token);
    assert_ne!(first.refresh_token, second.refresh_token);

    assert!(matches!(
        auth.refresh_token(&first.refresh_token).await,
        Err(AppError::InvalidRefreshToken)
    ));
    assert!(matches!(
        auth.refresh_token(&registered.refresh_token).await,
        Err(AppError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn test_concurrent_logins_leave_one_refresh_token() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    let registered = auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    let logins = (0..4).map(|_| auth.login("ada@example.com", PASSWORD));
    for result in futures::future::join_all(logins).await {
        result.unwrap();
    }

    assert_eq!(store.refresh_tokens_for(registered.user.id).await.len(), 1);
}

// =============================================================================
// Google login
// =============================================================================

#[tokio::test]
async fn test_google_login_creates_account_on_first_use() {
    let store = MemoryStore::new();
    let auth = authenticator_with(
        &store,
        verifier_returning(Some(google_identity("grace@example.com"))),
    );

    let response = auth.login_with_google("id-token").await.unwrap();

    assert_eq!(response.user.provider, AuthProvider::Google);
    assert_eq!(response.user.name, "Grace Hopper");
    assert_eq!(
        response.user.profile_image_url.as_deref(),
        Some("https://lh3.googleusercontent.com/a/photo")
    );

    let stored = store.user_by_email("grace@example.com").await.unwrap();
    assert_eq!(stored.google_id(), Some("110169484474386276334"));
    assert_eq!(stored.password_hash(), None);
    assert_eq!(store.refresh_tokens_for(stored.id).await.len(), 1);
}

#[tokio::test]
async fn test_google_login_reuses_existing_account() {
    let store = MemoryStore::new();
    let auth = authenticator_with(
        &store,
        verifier_returning(Some(google_identity("grace@example.com"))),
    );

    let first = auth.login_with_google("id-token").await.unwrap();
    let second = auth.login_with_google("id-token").await.unwrap();

    assert_eq!(first.user.id, second.user.id);
    assert_eq!(store.user_count().await, 1);
    assert_eq!(store.refresh_tokens_for(first.user.id).await.len(), 1);
}

#[tokio::test]
async fn test_google_login_for_local_email_keeps_local_account() {
    let store = MemoryStore::new();
    let auth = authenticator_with(
        &store,
        verifier_returning(Some(google_identity("ada@example.com"))),
    );
    let registered = auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    let response = auth.login_with_google("id-token").await.unwrap();

    assert_eq!(response.user.id, registered.user.id);
    assert_eq!(response.user.provider, AuthProvider::Local);
    assert_eq!(store.user_count().await, 1);
    assert!(auth.login("ada@example.com", PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_google_login_losing_insert_race_uses_winner_account() {
    let identity = google_identity("grace@example.com");
    let winner = User::new_google(
        identity.email.clone(),
        "Grace Hopper".to_string(),
        identity.subject.clone(),
        None,
    );
    let memory = MemoryStore::new();
    let store = RacingStore {
        inner: memory.clone(),
        rival: Mutex::new(Some(winner.clone())),
    };
    let auth = Authenticator::new(
        Arc::new(store),
        Arc::new(Argon2Hasher),
        Arc::new(verifier_returning(Some(identity))),
        tokens(),
    );

    let response = auth.login_with_google("id-token").await.unwrap();

    assert_eq!(response.user.id, winner.id);
    assert_eq!(memory.user_count().await, 1);
    assert_eq!(memory.refresh_tokens_for(winner.id).await.len(), 1);
}

#[tokio::test]
async fn test_google_login_uses_account_linked_to_subject() {
    let store = MemoryStore::new();
    let identity = google_identity("grace.new@example.com");
    let linked = User::new_google(
        "grace.old@example.com".to_string(),
        "Grace Hopper".to_string(),
        identity.subject.clone(),
        None,
    );
    store.seed_user(linked.clone()).await;
    let auth = authenticator_with(&store, verifier_returning(Some(identity)));

    let response = auth.login_with_google("id-token").await.unwrap();

    assert_eq!(response.user.id, linked.id);
    assert_eq!(response.user.email, "grace.old@example.com");
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_google_login_name_falls_back_to_email_local_part() {
    let store = MemoryStore::new();
    let mut identity = google_identity("grace.h@example.com");
    identity.name = None;
    identity.picture = None;
    let auth = authenticator_with(&store, verifier_returning(Some(identity)));

    let response = auth.login_with_google("id-token").await.unwrap();

    assert_eq!(response.user.name, "grace.h");
    assert_eq!(response.user.profile_image_url, None);
}

#[tokio::test]
async fn test_google_login_rejected_token() {
    let store = MemoryStore::new();
    let auth = authenticator_with(&store, verifier_returning(None));

    let result = auth.login_with_google("bad-token").await;

    assert!(matches!(result, Err(AppError::InvalidFederatedToken)));
    assert_eq!(store.user_count().await, 0);
}

#[tokio::test]
async fn test_google_login_unverified_email() {
    let store = MemoryStore::new();
    let mut identity = google_identity("grace@example.com");
    identity.email_verified = false;
    let auth = authenticator_with(&store, verifier_returning(Some(identity)));

    let result = auth.login_with_google("id-token").await;

    assert!(matches!(result, Err(AppError::EmailNotVerified)));
    assert_eq!(store.user_count().await, 0);
}

#[tokio::test]
async fn test_google_login_provider_outage_propagates() {
    let store = MemoryStore::new();
    let mut verifier = MockIdentityVerifier::new();
    verifier
        .expect_verify()
        .returning(|_| Err(AppError::service_unavailable("google tokeninfo")));
    let auth = authenticator_with(&store, verifier);

    let result = auth.login_with_google("id-token").await;

    assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
}

// =============================================================================
// Refresh and logout
// =============================================================================

#[tokio::test]
async fn test_refresh_returns_same_refresh_token_and_new_access_token() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    let login = auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    let refreshed = auth.refresh_token(&login.refresh_token).await.unwrap();

    assert_eq!(refreshed.refresh_token, login.refresh_token);
    assert_eq!(refreshed.user, login.user);
    let claims = auth.verify_access_token(&refreshed.access_token).unwrap();
    assert_eq!(claims.sub, "ada@example.com");
    assert!(store.has_refresh_token(&login.refresh_token).await);
}

#[tokio::test]
async fn test_refresh_unknown_token() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);

    let result = auth.refresh_token("never-issued").await;

    assert!(matches!(result, Err(AppError::InvalidRefreshToken)));
}

#[tokio::test]
async fn test_refresh_expired_token_is_deleted() {
    let store = MemoryStore::new();
    let user = User::new_local(
        "ada@example.com".to_string(),
        "Ada".to_string(),
        "hash".to_string(),
    );
    store.seed_user(user.clone()).await;
    store
        .seed_refresh_token("stale", user.id, Utc::now() - Duration::minutes(1))
        .await;
    let auth = authenticator(&store);

    let result = auth.refresh_token("stale").await;

    assert!(matches!(result, Err(AppError::RefreshTokenExpired)));
    assert!(!store.has_refresh_token("stale").await);
    assert!(matches!(
        auth.refresh_token("stale").await,
        Err(AppError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    let login = auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    auth.logout(&login.refresh_token).await.unwrap();

    assert!(!store.has_refresh_token(&login.refresh_token).await);
    assert!(matches!(
        auth.refresh_token(&login.refresh_token).await,
        Err(AppError::InvalidRefreshToken)
    ));
    // The access token stays valid until it expires.
    assert!(auth.verify_access_token(&login.access_token).is_ok());
}

#[tokio::test]
async fn test_logout_of_unknown_token_changes_nothing() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    let login = auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    assert!(auth.logout("never-issued").await.is_ok());
    assert!(auth.logout("never-issued").await.is_ok());

    assert_eq!(store.user_count().await, 1);
    assert!(store.has_refresh_token(&login.refresh_token).await);
    assert!(auth.refresh_token(&login.refresh_token).await.is_ok());
}

// =============================================================================
// Current user and access tokens
// =============================================================================

#[tokio::test]
async fn test_current_user() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    let login = auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    let me = auth.current_user("ada@example.com").await.unwrap();
    assert_eq!(me, login.user);

    assert!(matches!(
        auth.current_user("gone@example.com").await,
        Err(AppError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_refresh_token_is_not_accepted_as_access_token() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    let login = auth.register("ada@example.com", "Ada", PASSWORD).await.unwrap();

    assert!(matches!(
        auth.verify_access_token(&login.refresh_token),
        Err(AppError::TokenInvalid)
    ));
}
