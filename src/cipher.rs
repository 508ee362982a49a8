//! The envelope cipher.
//!
//! Turns a plaintext string into an opaque, integrity-protected `Envelope`
//! and back. The key is validated and bound when the cipher is constructed;
//! there is no lazy initialisation, so a cipher that exists is usable.

use std::fmt;

use ring::aead::LessSafeKey;
use ring::rand::SystemRandom;
use zeroize::Zeroizing;

use crate::config::CipherConfig;
use crate::crypto;
use crate::envelope::{EncryptionMetadata, Envelope};
use crate::error::VaultError;
use crate::keys::EncryptionKey;

/// Authenticated encryption of single secret values under one static key.
pub struct EnvelopeCipher {
    key: LessSafeKey,
    rng: SystemRandom,
    metadata: EncryptionMetadata,
}

impl EnvelopeCipher {
    /// Bind the key. The `EncryptionKey` is consumed and zeroised here.
    pub fn new(key: EncryptionKey) -> Result<Self, VaultError> {
        Self::with_metadata(key, EncryptionMetadata::default())
    }

    pub fn with_metadata(
        key: EncryptionKey,
        metadata: EncryptionMetadata,
    ) -> Result<Self, VaultError> {
        let bound = crypto::sealing_key(key.as_bytes())?;
        tracing::debug!(key_id = %metadata.key_id, "envelope cipher initialised");
        Ok(Self {
            key: bound,
            rng: SystemRandom::new(),
            metadata,
        })
    }

    pub fn from_config(config: CipherConfig) -> Result<Self, VaultError> {
        let CipherConfig { key, key_id } = config;
        Self::with_metadata(key, EncryptionMetadata::new(key_id))
    }

    /// Read `PATHVAULT_KEY` / `PATHVAULT_KEY_ID` and bind the key.
    pub fn from_env() -> Result<Self, VaultError> {
        Self::from_config(CipherConfig::from_env()?)
    }

    /// Metadata describing envelopes produced by this cipher.
    pub fn metadata(&self) -> &EncryptionMetadata {
        &self.metadata
    }

    /// Encrypt under a fresh nonce. Encrypting the same plaintext twice
    /// yields different envelopes.
    ///
    /// The empty string is returned as the empty envelope without being
    /// encrypted. Callers must not rely on empty values being protected.
    pub fn encrypt(&self, plaintext: &str) -> Result<Envelope, VaultError> {
        if plaintext.is_empty() {
            return Ok(Envelope::empty());
        }
        let sealed = crypto::seal(&self.key, &self.rng, plaintext.as_bytes())?;
        Ok(Envelope::from_sealed(&sealed))
    }

    /// Authenticate and decrypt an envelope.
    ///
    /// Tag mismatch, truncation, malformed encoding and non-UTF-8 output
    /// all fail with `EncryptionFailure`. The returned buffer is wiped on
    /// drop.
    pub fn decrypt(&self, envelope: &Envelope) -> Result<Zeroizing<String>, VaultError> {
        if envelope.is_empty() {
            return Ok(Zeroizing::new(String::new()));
        }
        let sealed = envelope.to_sealed()?;
        let plaintext = crypto::open(&self.key, &sealed)?;
        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|err| {
                // Wipe the rejected bytes before reporting.
                let _ = Zeroizing::new(err.into_bytes());
                VaultError::EncryptionFailure
            })
    }
}

impl fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCipher")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
