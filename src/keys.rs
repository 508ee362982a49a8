//! Key material ownership.
//!
//! The store runs under a single static 256-bit key supplied once at
//! startup. `EncryptionKey` is the only type that holds raw key bytes:
//!
//! - Not `Clone`. Cannot be duplicated without explicit conversion.
//! - Zeroised on drop.
//! - `Debug` prints a placeholder, never the bytes.
//!
//! Length is validated at construction, so a wrong-sized key is rejected
//! before any cipher exists.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::KEY_LEN;
use crate::error::VaultError;

/// 256-bit symmetric key for the envelope cipher.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Construct a key from exactly 32 raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Construct a key from a slice, rejecting anything that is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, VaultError> {
        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| VaultError::InvalidKey("key material must be 32 bytes"))?;
        Ok(Self { bytes })
    }

    /// Decode standard base64 text into a key.
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| VaultError::InvalidKey("key material is not valid base64"))?,
        );
        Self::from_slice(&decoded)
    }

    /// Borrow the raw key bytes. Raw bytes never leave the crate.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}
