//! Stored refresh token (session record).

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::constants::REFRESH_TOKEN_STORE_DAYS;

/// A persisted refresh token. At most one exists per user at a time.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: i64,
    pub token: String,
    pub user_id: Uuid,
    pub expiry_date: DateTime<Utc>,
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshToken")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}

impl RefreshToken {
    /// Expiry for a row created at `now`.
    pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(REFRESH_TOKEN_STORE_DAYS)
    }

    /// Whether the stored expiry lies before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
