//! Persistence boundary.
//!
//! The store treats its backend as a dumb keyed surface with a secondary
//! unique index on `path` and prefix scans. Two guarantees are required of
//! every implementation:
//!
//! 1. `save` enforces path uniqueness atomically. Of N concurrent saves of
//!    distinct ids at one path, exactly one succeeds; the rest get
//!    `BackendError::DuplicatePath`.
//! 2. `modify` and `delete_by_id` are atomic for a single record.

use std::fmt;
use std::sync::Arc;

use crate::error::VaultError;
use crate::record::{SecretId, SecretRecord};

pub mod memory;

pub use memory::InMemoryBackend;

/// Failures a backend may report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Another record already holds this path.
    DuplicatePath(String),
    /// The backend could not complete the operation.
    Unavailable(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePath(path) => write!(f, "duplicate path: {}", path),
            Self::Unavailable(reason) => write!(f, "backend unavailable: {}", reason),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for VaultError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DuplicatePath(path) => VaultError::AlreadyExists(path),
            BackendError::Unavailable(reason) => VaultError::Storage(reason),
        }
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Storage interface the store is written against.
pub trait PersistenceBackend: Send + Sync {
    fn find_by_id(&self, id: &SecretId) -> BackendResult<Option<SecretRecord>>;

    fn find_by_path(&self, path: &str) -> BackendResult<Option<SecretRecord>>;

    /// Insert, or replace the record with the same id. Fails with
    /// `DuplicatePath` if a record with a different id holds the path.
    fn save(&self, record: SecretRecord) -> BackendResult<SecretRecord>;

    /// Atomically apply `change` to the stored record and return the result,
    /// or `None` if no record has this id. `id` and `path` are immutable:
    /// whatever `change` does to them is discarded.
    fn modify(
        &self,
        id: &SecretId,
        change: &mut dyn FnMut(&mut SecretRecord),
    ) -> BackendResult<Option<SecretRecord>>;

    /// Remove the record. Returns whether one was removed.
    fn delete_by_id(&self, id: &SecretId) -> BackendResult<bool>;

    fn exists_by_id(&self, id: &SecretId) -> BackendResult<bool>;

    /// Every record whose path starts with `prefix` (raw string comparison),
    /// in a stable order.
    fn find_by_path_prefix(&self, prefix: &str) -> BackendResult<Vec<SecretRecord>>;
}

impl<T> PersistenceBackend for Arc<T>
where
    T: PersistenceBackend + ?Sized,
{
    fn find_by_id(&self, id: &SecretId) -> BackendResult<Option<SecretRecord>> {
        (**self).find_by_id(id)
    }

    fn find_by_path(&self, path: &str) -> BackendResult<Option<SecretRecord>> {
        (**self).find_by_path(path)
    }

    fn save(&self, record: SecretRecord) -> BackendResult<SecretRecord> {
        (**self).save(record)
    }

    fn modify(
        &self,
        id: &SecretId,
        change: &mut dyn FnMut(&mut SecretRecord),
    ) -> BackendResult<Option<SecretRecord>> {
        (**self).modify(id, change)
    }

    fn delete_by_id(&self, id: &SecretId) -> BackendResult<bool> {
        (**self).delete_by_id(id)
    }

    fn exists_by_id(&self, id: &SecretId) -> BackendResult<bool> {
        (**self).exists_by_id(id)
    }

    fn find_by_path_prefix(&self, prefix: &str) -> BackendResult<Vec<SecretRecord>> {
        (**self).find_by_path_prefix(prefix)
    }
}
