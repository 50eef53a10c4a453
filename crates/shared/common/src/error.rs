//! Unified error handling.
//!
//! Every failure of the authentication core is one `AppError` variant. Errors
//! travel unmodified from the point of detection to the HTTP boundary, which
//! is the only place that turns them into a status code and a response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Message returned when a Google account attempts a password login.
pub const USE_GOOGLE_LOGIN_MESSAGE: &str = "Please login using Google";

/// Message returned for any other failed password login.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Registration
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Google account already linked")]
    DuplicateGoogleAccount,

    // Credential & token failures
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Invalid Google token")]
    InvalidFederatedToken,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Authentication required")]
    Unauthorized,

    // Validation
    #[error("{0}")]
    Validation(String),

    // External service errors
    #[error("Service unavailable")]
    ServiceUnavailable(String),

    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "jwt")]
    #[error("Token error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::DuplicateGoogleAccount => "DUPLICATE_GOOGLE_ACCOUNT",
            AppError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            AppError::InvalidFederatedToken => "INVALID_FEDERATED_TOKEN",
            AppError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            AppError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AppError::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "TOKEN_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials(_)
            | AppError::InvalidFederatedToken
            | AppError::EmailNotVerified
            | AppError::InvalidRefreshToken
            | AppError::RefreshTokenExpired
            | AppError::TokenInvalid
            | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::DuplicateEmail | AppError::DuplicateGoogleAccount => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::ServiceUnavailable(service) => {
                tracing::error!("Service unavailable: {}", service);
                "Identity provider is unavailable".to_string()
            }
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            #[cfg(feature = "jwt")]
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::Password(msg) => AppError::Validation(msg),
            DomainError::Invariant(msg) | DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    /// Treat absence as a failed lookup of the refresh token
    fn ok_or_invalid_refresh(self) -> AppResult<T>;

    /// Treat absence as an unauthenticated caller
    fn ok_or_unauthorized(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_refresh(self) -> AppResult<T> {
        self.ok_or(AppError::InvalidRefreshToken)
    }

    fn ok_or_unauthorized(self) -> AppResult<T> {
        self.ok_or(AppError::Unauthorized)
    }
}

/// Convenience constructors
impl AppError {
    /// Generic failed password login.
    pub fn invalid_credentials() -> Self {
        AppError::InvalidCredentials(INVALID_CREDENTIALS_MESSAGE.to_string())
    }

    /// Password login attempted on a Google account.
    pub fn use_google_login() -> Self {
        AppError::InvalidCredentials(USE_GOOGLE_LOGIN_MESSAGE.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn service_unavailable(service: impl Into<String>) -> Self {
        AppError::ServiceUnavailable(service.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_and_token_failures_are_unauthorized() {
        for err in [
            AppError::invalid_credentials(),
            AppError::use_google_login(),
            AppError::InvalidFederatedToken,
            AppError::EmailNotVerified,
            AppError::InvalidRefreshToken,
            AppError::RefreshTokenExpired,
            AppError::TokenInvalid,
            AppError::Unauthorized,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "{:?}", err);
        }
    }

    #[test]
    fn test_other_status_mappings() {
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DuplicateGoogleAccount.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::service_unavailable("google").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::internal("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_google_account_message_is_distinct() {
        let google = AppError::use_google_login();
        let generic = AppError::invalid_credentials();

        assert_eq!(google.code(), generic.code());
        assert_eq!(google.user_message(), USE_GOOGLE_LOGIN_MESSAGE);
        assert_ne!(google.user_message(), generic.user_message());
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = AppError::internal("connection string postgres://secret");
        assert!(!err.user_message().contains("secret"));
    }

    #[test]
    fn test_domain_error_conversion() {
        let err: AppError = DomainError::password("too short").into();
        assert!(matches!(err, AppError::Validation(ref m) if m == "too short"));

        let err: AppError = DomainError::invariant("mixed columns").into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_option_ext() {
        let missing: Option<u8> = None;
        assert!(matches!(
            missing.ok_or_invalid_refresh(),
            Err(AppError::InvalidRefreshToken)
        ));
        assert!(matches!(missing.ok_or_unauthorized(), Err(AppError::Unauthorized)));
        assert_eq!(Some(3).ok_or_unauthorized().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = AppError::EmailNotVerified.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "EMAIL_NOT_VERIFIED");
        assert_eq!(body["error"]["message"], "Email not verified");
    }
}
