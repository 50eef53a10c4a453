//! Repository layer - credential storage.
//!
//! [`CredentialStore`] hands out transactions; every lookup and write the
//! orchestrator performs goes through one [`CredentialTx`].

mod credential_store;
pub mod entities;
#[cfg(any(test, feature = "test-utils"))]
mod memory_store;

pub use credential_store::{CredentialStore, CredentialTx, Persistence, TxCredentials};

#[cfg(any(test, feature = "test-utils"))]
pub use memory_store::MemoryStore;
