//! Startup configuration for the envelope cipher.
//!
//! Key material is read once, before the store accepts any request:
//!
//! - `PATHVAULT_KEY`: standard base64 of exactly 32 bytes (required)
//! - `PATHVAULT_KEY_ID`: label recorded in encryption metadata (optional)

use std::env;

use crate::envelope::DEFAULT_KEY_ID;
use crate::error::VaultError;
use crate::keys::EncryptionKey;

pub const KEY_ENV: &str = "PATHVAULT_KEY";
pub const KEY_ID_ENV: &str = "PATHVAULT_KEY_ID";

/// Validated inputs for `EnvelopeCipher::from_config`.
#[derive(Debug)]
pub struct CipherConfig {
    pub key: EncryptionKey,
    pub key_id: String,
}

impl CipherConfig {
    pub fn new(key: EncryptionKey) -> Self {
        Self {
            key,
            key_id: DEFAULT_KEY_ID.to_string(),
        }
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, VaultError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VaultError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoded = lookup(KEY_ENV)
            .filter(|value| !value.trim().is_empty())
            .ok_or(VaultError::InvalidKey("key material not configured"))?;
        let key = EncryptionKey::from_base64(&encoded)?;

        let key_id = lookup(KEY_ID_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_KEY_ID.to_string());

        Ok(Self { key, key_id })
    }
}
