//! Transactional credential store backed by SeaORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, IsolationLevel, NotSet, PaginatorTrait,
    QueryFilter, QuerySelect, Set, SqlErr, Statement, TransactionTrait,
};
use uuid::Uuid;

use super::entities::{refresh_token, user, RefreshTokenEntity, UserEntity};
use common::{AppError, AppResult};
use domain::{RefreshToken, User};

/// Source of unit-of-work transactions.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Open a read-write transaction.
    async fn begin(&self) -> AppResult<Box<dyn CredentialTx>>;

    /// Check that the backing store answers.
    async fn ping(&self) -> AppResult<()>;
}

/// One unit of work over users and refresh tokens.
///
/// Nothing written through a transaction is visible to others until
/// `commit`; `rollback` (or dropping the transaction) discards it.
#[async_trait]
pub trait CredentialTx: Send {
    async fn find_user_by_id(&mut self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>>;

    async fn find_user_by_google_id(&mut self, google_id: &str) -> AppResult<Option<User>>;

    async fn email_exists(&mut self, email: &str) -> AppResult<bool>;

    /// Insert a new user.
    ///
    /// # Errors
    /// `AppError::DuplicateEmail` when the email is already taken,
    /// `AppError::DuplicateGoogleAccount` when the Google subject is.
    /// The transaction stays usable after either.
    async fn insert_user(&mut self, user: &User) -> AppResult<()>;

    async fn find_refresh_token(&mut self, token: &str) -> AppResult<Option<RefreshToken>>;

    /// Delete every refresh token of a user, returning how many were removed.
    ///
    /// Serializes against other transactions touching the same user's tokens.
    async fn delete_refresh_tokens_for_user(&mut self, user_id: Uuid) -> AppResult<u64>;

    /// Delete one refresh token by value. Returns false if it was absent.
    async fn delete_refresh_token(&mut self, token: &str) -> AppResult<bool>;

    async fn insert_refresh_token(
        &mut self,
        token: &str,
        user_id: Uuid,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<RefreshToken>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// PostgreSQL-backed [`CredentialStore`].
#[derive(Clone)]
pub struct Persistence {
    db: DatabaseConnection,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for Persistence {
    async fn begin(&self) -> AppResult<Box<dyn CredentialTx>> {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await?;
        Ok(Box::new(TxCredentials { txn }))
    }

    async fn ping(&self) -> AppResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}

/// Open SeaORM transaction.
pub struct TxCredentials {
    txn: DatabaseTransaction,
}

fn to_user(model: user::Model) -> AppResult<User> {
    let id = model.id;
    User::try_from(model).map_err(|e| {
        AppError::internal(format!("corrupt user row {}: {}", id, e))
    })
}

/// A unique violation means a concurrent registration won.
fn insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("google_id") => {
            AppError::DuplicateGoogleAccount
        }
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("email") => {
            AppError::DuplicateEmail
        }
        _ => AppError::from(err),
    }
}

#[async_trait]
impl CredentialTx for TxCredentials {
    async fn find_user_by_id(&mut self, id: Uuid) -> AppResult<Option<User>> {
        UserEntity::find_by_id(id)
            .one(&self.txn)
            .await?
            .map(to_user)
            .transpose()
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.txn)
            .await?
            .map(to_user)
            .transpose()
    }

    async fn find_user_by_google_id(&mut self, google_id: &str) -> AppResult<Option<User>> {
        UserEntity::find()
            .filter(user::Column::GoogleId.eq(google_id))
            .one(&self.txn)
            .await?
            .map(to_user)
            .transpose()
    }

    async fn email_exists(&mut self, email: &str) -> AppResult<bool> {
        let count = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.txn)
            .await?;
        Ok(count > 0)
    }

    async fn insert_user(&mut self, new_user: &User) -> AppResult<()> {
        // Savepoint: a failed insert must not abort the enclosing transaction.
        let savepoint = self.txn.begin().await?;
        match user::ActiveModel::from(new_user).insert(&savepoint).await {
            Ok(_) => {
                savepoint.commit().await?;
                Ok(())
            }
            Err(e) => {
                savepoint.rollback().await?;
                Err(insert_error(e))
            }
        }
    }

    async fn find_refresh_token(&mut self, token: &str) -> AppResult<Option<RefreshToken>> {
        let found = RefreshTokenEntity::find()
            .filter(refresh_token::Column::Token.eq(token))
            .one(&self.txn)
            .await?;
        Ok(found.map(RefreshToken::from))
    }

    async fn delete_refresh_tokens_for_user(&mut self, user_id: Uuid) -> AppResult<u64> {
        // Row lock on the owner serializes concurrent logins of one user.
        UserEntity::find_by_id(user_id)
            .lock_exclusive()
            .one(&self.txn)
            .await?;

        let result = RefreshTokenEntity::delete_many()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete_refresh_token(&mut self, token: &str) -> AppResult<bool> {
        let result = RefreshTokenEntity::delete_many()
            .filter(refresh_token::Column::Token.eq(token))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn insert_refresh_token(
        &mut self,
        token: &str,
        user_id: Uuid,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<RefreshToken> {
        let model = refresh_token::ActiveModel {
            id: NotSet,
            token: Set(token.to_string()),
            user_id: Set(user_id),
            expiry_date: Set(expiry_date),
        }
        .insert(&self.txn)
        .await?;
        Ok(RefreshToken::from(model))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        this.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        this.txn.rollback().await?;
        Ok(())
    }
}
