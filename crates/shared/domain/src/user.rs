//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_AVATAR_BASE_URL, PROVIDER_GOOGLE, PROVIDER_LOCAL};
use crate::error::{DomainError, DomainResult};

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthProvider {
    Local,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => PROVIDER_LOCAL,
            AuthProvider::Google => PROVIDER_GOOGLE,
        }
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            PROVIDER_LOCAL => Ok(AuthProvider::Local),
            PROVIDER_GOOGLE => Ok(AuthProvider::Google),
            other => Err(DomainError::invariant(format!("unknown provider '{}'", other))),
        }
    }
}

/// Provider-specific credential material.
///
/// A local account always carries a password hash and never a federated id;
/// a Google account is the reverse. The enum makes any other combination
/// unrepresentable.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Local { password_hash: String },
    Google { google_id: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Local { .. } => f
                .debug_struct("Local")
                .field("password_hash", &"[REDACTED]")
                .finish(),
            Credentials::Google { google_id } => f
                .debug_struct("Google")
                .field("google_id", google_id)
                .finish(),
        }
    }
}

impl Credentials {
    /// Rebuild credentials from the nullable storage columns.
    ///
    /// # Errors
    /// `DomainError::Invariant` if the columns do not match the provider tag.
    pub fn from_parts(
        provider: AuthProvider,
        password_hash: Option<String>,
        google_id: Option<String>,
    ) -> DomainResult<Self> {
        match (provider, password_hash, google_id) {
            (AuthProvider::Local, Some(password_hash), None) => {
                Ok(Credentials::Local { password_hash })
            }
            (AuthProvider::Google, None, Some(google_id)) => Ok(Credentials::Google { google_id }),
            (provider, hash, gid) => Err(DomainError::invariant(format!(
                "{} user stored with password_hash={} google_id={}",
                provider,
                hash.is_some(),
                gid.is_some()
            ))),
        }
    }

    pub fn provider(&self) -> AuthProvider {
        match self {
            Credentials::Local { .. } => AuthProvider::Local,
            Credentials::Google { .. } => AuthProvider::Google,
        }
    }
}

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub profile_image_url: Option<String>,
    pub credentials: Credentials,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New password-authenticated user with the generated default avatar.
    pub fn new_local(email: String, name: String, password_hash: String) -> Self {
        let avatar = default_avatar_url(&name);
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            profile_image_url: Some(avatar),
            credentials: Credentials::Local { password_hash },
            created_at: Utc::now(),
        }
    }

    /// New Google-federated user built from verified identity claims.
    pub fn new_google(
        email: String,
        name: String,
        google_id: String,
        profile_image_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            profile_image_url,
            credentials: Credentials::Google { google_id },
            created_at: Utc::now(),
        }
    }

    pub fn provider(&self) -> AuthProvider {
        self.credentials.provider()
    }

    pub fn is_local(&self) -> bool {
        matches!(self.credentials, Credentials::Local { .. })
    }

    pub fn is_federated(&self) -> bool {
        !self.is_local()
    }

    /// Stored password hash, only present for local accounts.
    pub fn password_hash(&self) -> Option<&str> {
        match &self.credentials {
            Credentials::Local { password_hash } => Some(password_hash),
            Credentials::Google { .. } => None,
        }
    }

    /// Google subject id, only present for federated accounts.
    pub fn google_id(&self) -> Option<&str> {
        match &self.credentials {
            Credentials::Google { google_id } => Some(google_id),
            Credentials::Local { .. } => None,
        }
    }
}

/// Deterministic avatar URL derived from a display name.
pub fn default_avatar_url(name: &str) -> String {
    format!("{}{}", DEFAULT_AVATAR_BASE_URL, name.replace(' ', "+"))
}

/// Public projection of a user (safe to return to client)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Uuid,
    /// User email address
    pub email: String,
    /// User display name
    pub name: String,
    /// Avatar or Google profile picture
    pub profile_image_url: Option<String>,
    /// Account provider
    pub provider: AuthProvider,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            profile_image_url: user.profile_image_url.clone(),
            provider: user.provider(),
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let provider = user.provider();
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            profile_image_url: user.profile_image_url,
            provider,
        }
    }
}
