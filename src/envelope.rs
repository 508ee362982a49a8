//! Envelope encoding and encryption metadata.
//!
//! An envelope is the only form in which a secret value is ever stored:
//!
//! ```text
//! base64( nonce (12 bytes) || ciphertext || tag (16 bytes) )
//! ```
//!
//! The empty envelope is the encoding of the empty plaintext, which the
//! cipher passes through unencrypted.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::crypto::{NONCE_LEN, TAG_LEN};
use crate::error::VaultError;

/// Algorithm label recorded in every record's metadata.
pub const ALGORITHM_LABEL: &str = "AES-256-GCM";

/// Key id used when none is configured.
pub const DEFAULT_KEY_ID: &str = "default";

/// Opaque, self-describing encrypted value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(String);

impl Envelope {
    /// Wrap already-encoded envelope text (e.g. read back from storage).
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub(crate) fn from_sealed(sealed: &[u8]) -> Self {
        Self(STANDARD.encode(sealed))
    }

    pub(crate) fn empty() -> Self {
        Self(String::new())
    }

    /// The encoded text, suitable for text storage.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode to raw `nonce || ciphertext || tag` bytes, rejecting malformed
    /// encoding and anything shorter than nonce plus tag.
    pub(crate) fn to_sealed(&self) -> Result<Vec<u8>, VaultError> {
        let bytes = STANDARD
            .decode(&self.0)
            .map_err(|_| VaultError::EncryptionFailure)?;
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::EncryptionFailure);
        }
        Ok(bytes)
    }
}

// Envelopes are ciphertext, but they still stay out of debug output.
impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope({} chars)", self.0.len())
    }
}

/// Describes how an envelope was produced. Stored alongside the envelope
/// and passed through untouched, so a later key rotation can tell which key
/// sealed which record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    pub algorithm: String,
    pub key_id: String,
}

impl EncryptionMetadata {
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            algorithm: ALGORITHM_LABEL.to_string(),
            key_id: key_id.into(),
        }
    }
}

impl Default for EncryptionMetadata {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_ID)
    }
}
