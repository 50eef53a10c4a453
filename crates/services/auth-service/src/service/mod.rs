//! Authentication service business logic.

mod auth_service;
mod hasher;
mod token_service;

#[cfg(test)]
mod tests;

pub use auth_service::{AuthResponse, AuthService, Authenticator};
pub use hasher::{Argon2Hasher, CredentialHasher};
pub use token_service::{AccessClaims, RefreshClaims, TokenService, TokenSettings};

#[cfg(any(test, feature = "test-utils"))]
pub use hasher::MockCredentialHasher;
