//! API Gateway Library
//!
//! HTTP surface of the auth service: JSON routes, bearer filter, OpenAPI
//! docs and health check.

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use auth_service_lib::AuthComponents;

use crate::config::GatewayConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// Router with tracing and CORS layers applied.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Serve the gateway until the process is stopped.
pub async fn run_server(
    host: &str,
    port: u16,
    components: AuthComponents,
    config: GatewayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_components(components, config);
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
