//! Application state for dependency injection.

use std::sync::Arc;

use auth_service_lib::repository::CredentialStore;
use auth_service_lib::{AuthComponents, AuthService};

use crate::config::GatewayConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    /// Used by the health check only
    pub store: Arc<dyn CredentialStore>,
    pub config: GatewayConfig,
}

impl AppState {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        store: Arc<dyn CredentialStore>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            auth_service,
            store,
            config,
        }
    }

    pub fn from_components(components: AuthComponents, config: GatewayConfig) -> Self {
        Self::new(components.auth_service, components.store, config)
    }
}
