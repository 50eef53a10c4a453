//! Domain layer - Core authentication entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! users and their credential variants, stored refresh tokens, and the
//! password value object.

pub mod constants;
pub mod error;
pub mod password;
pub mod refresh_token;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::Password;
pub use refresh_token::RefreshToken;
pub use user::{default_avatar_url, AuthProvider, Credentials, User, UserResponse};
