//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use auth_service_lib::AuthResponse;
use domain::{AuthProvider, UserResponse};

use crate::handlers::auth_handler::{
    GoogleLoginRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
};
use crate::handlers::health_handler::{HealthResponse, ServiceHealth, ServiceStatus};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth_handler::register,
        crate::handlers::auth_handler::login,
        crate::handlers::auth_handler::login_with_google,
        crate::handlers::auth_handler::refresh,
        crate::handlers::auth_handler::logout,
        crate::handlers::user_handler::get_current_user,
        crate::handlers::health_handler::health_check,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            GoogleLoginRequest,
            RefreshTokenRequest,
            AuthResponse,
            UserResponse,
            AuthProvider,
            HealthResponse,
            ServiceStatus,
            ServiceHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and token endpoints"),
        (name = "Users", description = "Authenticated user endpoints"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
