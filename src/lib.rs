//! # pathvault
//!
//! Path-addressed secret store with authenticated encryption at rest.
//!
//! Secrets are stored under unique hierarchical paths as AES-256-GCM
//! envelopes, carry a version that advances by one on every update, and
//! every operation is gated by a pluggable capability check tied to the
//! calling principal.
//!
//! ## Public API
//!
//! The public surface is intentionally narrow: the store, the cipher, the
//! policy trait, the backend trait and their data types. Raw key bytes and
//! the `ring` primitives stay inside the crate.

// Module declarations.
pub mod audit;
pub mod backend;
pub mod cipher;
pub mod config;
pub(crate) mod crypto;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod path;
pub mod policy;
pub mod record;
pub mod store;

pub use backend::{InMemoryBackend, PersistenceBackend};
pub use cipher::EnvelopeCipher;
pub use envelope::{EncryptionMetadata, Envelope};
pub use error::{Result, VaultError};
pub use keys::EncryptionKey;
pub use policy::{AccessPolicy, Capability, Principal, PrivilegedPrincipalPolicy, Target};
pub use record::{SecretId, SecretMetadata, SecretRecord};
pub use store::SecretStore;

/// Generate a fresh random 256-bit key.
///
/// Production deployments should load key material through
/// `config::CipherConfig::from_env` instead.
pub fn generate_key() -> Result<EncryptionKey> {
    let bytes = crypto::generate_random_key()?;
    Ok(EncryptionKey::from_bytes(bytes))
}
