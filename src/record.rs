//! The persisted unit.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::{EncryptionMetadata, Envelope};
use crate::error::VaultError;

/// Opaque unique identifier, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretId(Uuid);

impl SecretId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SecretId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for SecretId {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| VaultError::ValidationError(format!("malformed secret id: {}", s)))
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored secret. Holds the envelope, never the plaintext.
///
/// `id`, `path` and `created_at` are fixed at creation. `envelope`,
/// `version`, `encryption_metadata` and `updated_at` change together on
/// every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub id: SecretId,
    pub path: String,
    pub envelope: Envelope,
    pub version: u64,
    pub encryption_metadata: EncryptionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
    /// A fresh version-1 record.
    pub(crate) fn new(
        path: String,
        envelope: Envelope,
        encryption_metadata: EncryptionMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SecretId::generate(),
            path,
            envelope,
            version: 1,
            encryption_metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the envelope and advance the version by exactly one.
    pub(crate) fn apply_update(
        &mut self,
        envelope: Envelope,
        encryption_metadata: EncryptionMetadata,
    ) {
        self.envelope = envelope;
        self.encryption_metadata = encryption_metadata;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Everything but the envelope.
    pub fn metadata(&self) -> SecretMetadata {
        SecretMetadata {
            id: self.id,
            path: self.path.clone(),
            version: self.version,
            encryption_metadata: self.encryption_metadata.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A record without its envelope, for responses that must not carry the
/// secret in any form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
    pub id: SecretId,
    pub path: String,
    pub version: u64,
    pub encryption_metadata: EncryptionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
