//! Gateway configuration.

use std::env;

use common::ServiceConfig;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address and log level
    pub server: ServiceConfig,
    /// Origins allowed by CORS; empty allows any origin
    pub cors_allowed_origins: Vec<String>,
}

impl GatewayConfig {
    /// Load from `GATEWAY_HOST`, `GATEWAY_PORT`, `LOG_LEVEL` and
    /// `CORS_ALLOWED_ORIGINS` (comma separated).
    pub fn from_env() -> Self {
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            server: ServiceConfig::from_env("gateway", "GATEWAY"),
            cors_allowed_origins,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServiceConfig {
                service_name: "gateway".to_string(),
                ..ServiceConfig::default()
            },
            cors_allowed_origins: Vec::new(),
        }
    }
}
