//! In-memory [`CredentialStore`] for tests.
//!
//! Transactions are serialized by a single mutex and write to a staged copy
//! of the state, so uncommitted work is invisible and rollback is a drop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::credential_store::{CredentialStore, CredentialTx};
use common::{AppError, AppResult};
use domain::{RefreshToken, User};

#[derive(Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    last_token_id: i64,
}

/// Shared handle; clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user directly, bypassing transactions.
    pub async fn seed_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Insert a refresh token row directly, e.g. one that is already expired.
    pub async fn seed_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expiry_date: DateTime<Utc>,
    ) -> RefreshToken {
        let mut state = self.state.lock().await;
        insert_token(&mut state, token, user_id, expiry_date)
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        let state = self.state.lock().await;
        state.users.values().find(|u| u.email == email).cloned()
    }

    pub async fn refresh_tokens_for(&self, user_id: Uuid) -> Vec<RefreshToken> {
        let state = self.state.lock().await;
        state
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn has_refresh_token(&self, token: &str) -> bool {
        self.state.lock().await.refresh_tokens.contains_key(token)
    }
}

fn insert_token(
    state: &mut MemoryState,
    token: &str,
    user_id: Uuid,
    expiry_date: DateTime<Utc>,
) -> RefreshToken {
    state.last_token_id += 1;
    let row = RefreshToken {
        id: state.last_token_id,
        token: token.to_string(),
        user_id,
        expiry_date,
    };
    state.refresh_tokens.insert(row.token.clone(), row.clone());
    row
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn CredentialTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl CredentialTx for MemoryTx {
    async fn find_user_by_id(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        Ok(self.staged.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_google_id(&mut self, google_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| u.google_id() == Some(google_id))
            .cloned())
    }

    async fn email_exists(&mut self, email: &str) -> AppResult<bool> {
        Ok(self.staged.users.values().any(|u| u.email == email))
    }

    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        if self.staged.users.values().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateEmail);
        }
        if let Some(google_id) = user.google_id() {
            if self.staged.users.values().any(|u| u.google_id() == Some(google_id)) {
                return Err(AppError::DuplicateGoogleAccount);
            }
        }
        self.staged.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_refresh_token(&mut self, token: &str) -> AppResult<Option<RefreshToken>> {
        Ok(self.staged.refresh_tokens.get(token).cloned())
    }

    async fn delete_refresh_tokens_for_user(&mut self, user_id: Uuid) -> AppResult<u64> {
        let before = self.staged.refresh_tokens.len();
        self.staged.refresh_tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - self.staged.refresh_tokens.len()) as u64)
    }

    async fn delete_refresh_token(&mut self, token: &str) -> AppResult<bool> {
        Ok(self.staged.refresh_tokens.remove(token).is_some())
    }

    async fn insert_refresh_token(
        &mut self,
        token: &str,
        user_id: Uuid,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<RefreshToken> {
        if self.staged.refresh_tokens.contains_key(token) {
            return Err(AppError::internal("duplicate refresh token"));
        }
        if !self.staged.users.contains_key(&user_id) {
            return Err(AppError::internal("refresh token owner does not exist"));
        }
        Ok(insert_token(&mut self.staged, token, user_id, expiry_date))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
