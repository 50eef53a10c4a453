//! Clients for external identity providers.

mod google_verifier;

pub use google_verifier::{GoogleTokenVerifier, IdentityVerifier, VerifiedIdentity};

#[cfg(any(test, feature = "test-utils"))]
pub use google_verifier::MockIdentityVerifier;
