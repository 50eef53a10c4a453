//! Auth service configuration.

use common::{AppResult, DatabaseConfig, GoogleConfig, JwtConfig};

/// Everything the auth core needs at startup.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub jwt: JwtConfig,
    pub database: DatabaseConfig,
    pub google: GoogleConfig,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails when the JWT settings are missing or too weak.
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            jwt: JwtConfig::from_env()?,
            database: DatabaseConfig::from_env(),
            google: GoogleConfig::from_env(),
        })
    }
}
