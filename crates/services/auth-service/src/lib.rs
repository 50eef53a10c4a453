//! Auth Service Library
//!
//! Registration, password and Google login, and refresh-token rotation over
//! PostgreSQL. The HTTP surface lives in the gateway crate; this crate only
//! exposes the [`AuthService`] use cases and the wiring to build them.

pub mod client;
pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tracing::info;

use crate::client::GoogleTokenVerifier;
use crate::config::AuthServiceConfig;
use crate::infra::Database;
use crate::repository::{CredentialStore, Persistence};
use crate::service::{Argon2Hasher, Authenticator, TokenService, TokenSettings};
use common::{AppResult, DatabaseConfig};

pub use crate::service::{AccessClaims, AuthResponse, AuthService};

/// Production components shared by the HTTP layer.
#[derive(Clone)]
pub struct AuthComponents {
    pub auth_service: Arc<dyn AuthService>,
    pub store: Arc<dyn CredentialStore>,
}

/// Connect to the database, apply migrations and assemble the orchestrator.
pub async fn build(config: &AuthServiceConfig) -> AppResult<AuthComponents> {
    let db = Database::connect(&config.database).await?;
    let store: Arc<dyn CredentialStore> = Arc::new(Persistence::new(db.get_connection()));

    let verifier = GoogleTokenVerifier::new(&config.google)?;
    if config.google.client_id.is_empty() {
        tracing::warn!("GOOGLE_CLIENT_ID is not set; Google login will fail");
    }

    let tokens = TokenService::new(TokenSettings::from(&config.jwt));
    let auth_service: Arc<dyn AuthService> = Arc::new(Authenticator::new(
        Arc::clone(&store),
        Arc::new(Argon2Hasher),
        Arc::new(verifier),
        Arc::new(tokens),
    ));

    info!("Auth service ready");
    Ok(AuthComponents {
        auth_service,
        store,
    })
}

/// Migration action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Run a migration command (for CLI commands).
pub async fn run_migrations(config: &DatabaseConfig, action: MigrateAction) -> AppResult<()> {
    let db = Database::connect_without_migrations(config).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            for (name, applied) in db.migration_status().await? {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}
