//! Error types for pathvault.
//!
//! Every variant is a distinct, terminal failure mode. None of them is
//! transient, so nothing in the crate retries. Messages name *what* failed
//! (an id, a path, a capability) and never carry key bytes, plaintext,
//! envelopes or messages from the underlying cipher library.

use std::fmt;

use crate::policy::Capability;

/// The single error type for all pathvault operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// No live secret exists with the given id or path.
    NotFound(String),

    /// The access policy refused the principal the required capability.
    PermissionDenied {
        principal: String,
        capability: Capability,
    },

    /// A live secret already occupies the path.
    AlreadyExists(String),

    /// Encryption or decryption failed. This covers a wrong key, a tampered
    /// or truncated envelope, malformed encoding, and randomness failure.
    EncryptionFailure,

    /// The request was malformed (bad path).
    ValidationError(String),

    /// Key material was missing, undecodable or of the wrong length.
    /// Only raised while constructing the cipher.
    InvalidKey(&'static str),

    /// The persistence backend failed.
    Storage(String),
}

impl VaultError {
    /// Returns true for the expected outcomes a caller is meant to handle
    /// (as opposed to key, cipher or storage faults).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::PermissionDenied { .. }
                | Self::AlreadyExists(_)
                | Self::ValidationError(_)
        )
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(target) => write!(f, "secret not found: {}", target),
            Self::PermissionDenied {
                principal,
                capability,
            } => write!(f, "permission denied: {} lacks {}", principal, capability),
            Self::AlreadyExists(path) => write!(f, "secret already exists: {}", path),
            Self::EncryptionFailure => write!(f, "encryption failure"),
            Self::ValidationError(reason) => write!(f, "validation error: {}", reason),
            Self::InvalidKey(reason) => write!(f, "invalid key: {}", reason),
            Self::Storage(reason) => write!(f, "storage error: {}", reason),
        }
    }
}

impl std::error::Error for VaultError {}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, VaultError>;
