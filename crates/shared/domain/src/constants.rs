//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum email length (matches the `users.email` column)
pub const MAX_EMAIL_LENGTH: usize = 150;

/// Maximum display name length (matches the `users.name` column)
pub const MAX_NAME_LENGTH: usize = 100;

// =============================================================================
// Authentication
// =============================================================================

/// Default access token lifetime in minutes
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 15;

/// Default refresh token (JWT) lifetime in days
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;

/// Upper bound on the access token lifetime (one year)
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 365 * 24 * 60;

/// Upper bound on the refresh token (JWT) lifetime (ten years)
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 3650;

/// Lifetime of a stored refresh token row, independent of the JWT expiry.
pub const REFRESH_TOKEN_STORE_DAYS: i64 = 7;

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

// =============================================================================
// Providers
// =============================================================================

/// Provider tag for password-authenticated accounts
pub const PROVIDER_LOCAL: &str = "LOCAL";

/// Provider tag for Google-federated accounts
pub const PROVIDER_GOOGLE: &str = "GOOGLE";

/// Avatar service used for locally registered users
pub const DEFAULT_AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/?name=";
