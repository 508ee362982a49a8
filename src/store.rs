//! Path-addressed, versioned, access-controlled secret store.
//!
//! Every operation runs the same sequence:
//!
//! 1. Capability check against the injected `AccessPolicy`. A denial ends
//!    the operation before any lookup or cipher work.
//! 2. Validation, lookup, cipher and backend work.
//! 3. One audit record describing the outcome.
//!
//! Reads return records with their envelopes intact. Decrypting is a
//! separate step the caller opts into through `cipher()`.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument, warn};

use crate::audit::{AuditLog, AuditRecord, AuditSink, Operation, Outcome};
use crate::backend::{BackendError, InMemoryBackend, PersistenceBackend};
use crate::cipher::EnvelopeCipher;
use crate::error::{Result, VaultError};
use crate::path;
use crate::policy::{AccessPolicy, Capability, Principal, PrivilegedPrincipalPolicy, Target};
use crate::record::{SecretId, SecretRecord};

/// The secret store.
pub struct SecretStore {
    cipher: EnvelopeCipher,
    policy: Arc<dyn AccessPolicy>,
    backend: Arc<dyn PersistenceBackend>,
    audit: Mutex<AuditLog>,
    sinks: Mutex<Vec<Box<dyn AuditSink>>>,
}

impl SecretStore {
    pub fn new<B, P>(cipher: EnvelopeCipher, backend: B, policy: P) -> Self
    where
        B: PersistenceBackend + 'static,
        P: AccessPolicy + 'static,
    {
        Self {
            cipher,
            policy: Arc::new(policy),
            backend: Arc::new(backend),
            audit: Mutex::new(AuditLog::new()),
            sinks: Mutex::new(Vec::new()),
        }
    }

    /// Keep at most `retention` audit records in memory. Sinks still see
    /// every record.
    pub fn with_audit_retention(mut self, retention: usize) -> Self {
        self.audit = Mutex::new(AuditLog::with_retention(retention));
        self
    }

    /// An in-memory store under the reference policy.
    pub fn in_memory(cipher: EnvelopeCipher) -> Self {
        Self::new(
            cipher,
            InMemoryBackend::new(),
            PrivilegedPrincipalPolicy::default(),
        )
    }

    /// The cipher, for callers that decide to reveal a record's plaintext.
    pub fn cipher(&self) -> &EnvelopeCipher {
        &self.cipher
    }

    /// Snapshot of the recent operations held in memory.
    pub fn audit_log(&self) -> AuditLog {
        self.audit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forward every subsequent audit record to `sink`.
    pub fn add_audit_sink(&self, sink: Box<dyn AuditSink>) {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    /// Create a secret at `path` with version 1.
    ///
    /// A blank value is a `ValidationError`.
    ///
    /// Path uniqueness is enforced by the backend's unique index, not by a
    /// prior lookup, so concurrent creators at one path resolve to exactly
    /// one success.
    #[instrument(skip_all, fields(path = %path, principal = %principal))]
    pub fn create(
        &self,
        path: &str,
        plaintext: &str,
        principal: &Principal,
    ) -> Result<SecretRecord> {
        let target = Target::Path(path);
        let result = self
            .authorize(principal, target, Capability::Write)
            .and_then(|()| self.insert(path, plaintext));
        self.journal(Operation::Create, principal, target, result)
    }

    /// Fetch by id. The envelope is returned undecrypted.
    #[instrument(skip_all, fields(id = %id, principal = %principal))]
    pub fn get_by_id(&self, id: &SecretId, principal: &Principal) -> Result<SecretRecord> {
        let target = Target::Id(id);
        let result = self
            .authorize(principal, target, Capability::Read)
            .and_then(|()| self.load(id));
        self.journal(Operation::GetById, principal, target, result)
    }

    /// Fetch by path. The envelope is returned undecrypted.
    #[instrument(skip_all, fields(path = %path, principal = %principal))]
    pub fn get_by_path(&self, path: &str, principal: &Principal) -> Result<SecretRecord> {
        let target = Target::Path(path);
        let result = self
            .authorize(principal, target, Capability::Read)
            .and_then(|()| {
                path::validate(path)?;
                debug!("looking up secret by path");
                self.backend.find_by_path(path)?.ok_or_else(|| {
                    warn!("secret not found");
                    VaultError::NotFound(path.to_string())
                })
            });
        self.journal(Operation::GetByPath, principal, target, result)
    }

    /// Replace the value under a fresh nonce and advance the version by one.
    ///
    /// Last writer wins: no check is made that the caller saw the current
    /// version. The increment itself is atomic in the backend, so concurrent
    /// updates never produce the same version twice.
    #[instrument(skip_all, fields(id = %id, principal = %principal))]
    pub fn update(
        &self,
        id: &SecretId,
        new_plaintext: &str,
        principal: &Principal,
    ) -> Result<SecretRecord> {
        let target = Target::Id(id);
        let result = self
            .authorize(principal, target, Capability::Write)
            .and_then(|()| self.replace(id, new_plaintext));
        self.journal(Operation::Update, principal, target, result)
    }

    /// Hard delete. No tombstone is kept.
    #[instrument(skip_all, fields(id = %id, principal = %principal))]
    pub fn delete(&self, id: &SecretId, principal: &Principal) -> Result<()> {
        let target = Target::Id(id);
        let result = self
            .authorize(principal, target, Capability::Delete)
            .and_then(|()| self.remove(id));
        self.journal(Operation::Delete, principal, target, result)
    }

    /// Every live record whose path starts with `prefix`.
    ///
    /// This is a raw string comparison, not segment-aware: `"/db"` matches
    /// `"/db/user"` and `"/dbadmin/user"` alike. An empty prefix lists all.
    #[instrument(skip_all, fields(prefix = %prefix, principal = %principal))]
    pub fn list_by_prefix(
        &self,
        prefix: &str,
        principal: &Principal,
    ) -> Result<Vec<SecretRecord>> {
        let target = Target::Prefix(prefix);
        let result = self
            .authorize(principal, target, Capability::List)
            .and_then(|()| {
                let records = self.backend.find_by_path_prefix(prefix)?;
                info!(count = records.len(), "listed secrets");
                Ok(records)
            });
        self.journal(Operation::ListByPrefix, principal, target, result)
    }

    fn authorize(
        &self,
        principal: &Principal,
        target: Target<'_>,
        capability: Capability,
    ) -> Result<()> {
        if self.policy.allows(principal, target, capability) {
            return Ok(());
        }
        warn!(%capability, "permission denied");
        Err(VaultError::PermissionDenied {
            principal: principal.to_string(),
            capability,
        })
    }

    fn insert(&self, path: &str, plaintext: &str) -> Result<SecretRecord> {
        path::validate(path)?;
        require_value(plaintext)?;
        let envelope = self.cipher.encrypt(plaintext)?;
        let metadata = self.cipher.metadata().clone();
        let record = SecretRecord::new(path.to_string(), envelope, metadata);

        let saved = self.backend.save(record).map_err(|err| {
            if let BackendError::DuplicatePath(_) = err {
                warn!("secret already exists at path");
            }
            VaultError::from(err)
        })?;

        info!(id = %saved.id, "secret created");
        Ok(saved)
    }

    fn load(&self, id: &SecretId) -> Result<SecretRecord> {
        debug!("looking up secret by id");
        self.backend.find_by_id(id)?.ok_or_else(|| {
            warn!("secret not found");
            VaultError::NotFound(id.to_string())
        })
    }

    fn replace(&self, id: &SecretId, new_plaintext: &str) -> Result<SecretRecord> {
        require_value(new_plaintext)?;
        self.load(id)?;

        let envelope = self.cipher.encrypt(new_plaintext)?;
        let metadata = self.cipher.metadata().clone();
        let mut pending = Some((envelope, metadata));

        let updated = self
            .backend
            .modify(id, &mut |record| {
                if let Some((envelope, metadata)) = pending.take() {
                    record.apply_update(envelope, metadata);
                }
            })?
            // Deleted between the lookup and the write.
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;

        info!(version = updated.version, "secret updated");
        Ok(updated)
    }

    fn remove(&self, id: &SecretId) -> Result<()> {
        if !self.backend.exists_by_id(id)? {
            warn!("secret not found");
            return Err(VaultError::NotFound(id.to_string()));
        }
        if !self.backend.delete_by_id(id)? {
            return Err(VaultError::NotFound(id.to_string()));
        }
        info!("secret deleted");
        Ok(())
    }

    /// Append the audit record for an operation and hand its result back.
    fn journal<T: Versioned>(
        &self,
        operation: Operation,
        principal: &Principal,
        target: Target<'_>,
        result: Result<T>,
    ) -> Result<T> {
        let (outcome, version) = match &result {
            Ok(value) => (Outcome::Success, value.version()),
            Err(err) => (Outcome::from(err), None),
        };
        let record = AuditRecord {
            operation,
            principal: principal.to_string(),
            target: target.to_string(),
            outcome,
            version,
            timestamp: chrono::Utc::now(),
        };
        // Sinks may do I/O, so they never run under the in-memory log's lock.
        {
            let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
            for sink in sinks.iter_mut() {
                sink.append(record.clone());
            }
        }
        self.audit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .append(record);
        result
    }
}

fn require_value(plaintext: &str) -> Result<()> {
    if plaintext.trim().is_empty() {
        return Err(VaultError::ValidationError("value must not be blank".into()));
    }
    Ok(())
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}

/// Version carried into the audit record for a successful result.
trait Versioned {
    fn version(&self) -> Option<u64>;
}

impl Versioned for SecretRecord {
    fn version(&self) -> Option<u64> {
        Some(self.version)
    }
}

impl Versioned for Vec<SecretRecord> {
    fn version(&self) -> Option<u64> {
        None
    }
}

impl Versioned for () {
    fn version(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::EncryptionKey;
    use crate::policy;

    fn store() -> SecretStore {
        let cipher = EnvelopeCipher::new(EncryptionKey::from_bytes([4u8; 32])).unwrap();
        SecretStore::in_memory(cipher)
    }

    fn admin() -> Principal {
        Principal::from("admin")
    }

    #[test]
    fn test_create_then_get() {
        let store = store();
        let created = store.create("/app/key", "value", &admin()).unwrap();
        assert_eq!(created.version, 1);
        assert_eq!(created.created_at, created.updated_at);

        let by_id = store.get_by_id(&created.id, &"reader".into()).unwrap();
        let by_path = store.get_by_path("/app/key", &"reader".into()).unwrap();
        assert_eq!(by_id, created);
        assert_eq!(by_path, created);
    }

    #[test]
    fn test_duplicate_create_is_rejected() {
        let store = store();
        store.create("/a", "1", &admin()).unwrap();
        assert_eq!(
            store.create("/a", "2", &admin()).unwrap_err(),
            VaultError::AlreadyExists("/a".into())
        );
    }

    #[test]
    fn test_update_keeps_identity() {
        let store = store();
        let created = store.create("/a", "1", &admin()).unwrap();
        let updated = store.update(&created.id, "2", &admin()).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.path, created.path);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.version, 2);
        assert_ne!(updated.envelope, created.envelope);
    }

    #[test]
    fn test_missing_records() {
        let store = store();
        let ghost = SecretId::generate();
        assert!(matches!(store.get_by_id(&ghost, &admin()), Err(VaultError::NotFound(_))));
        assert!(matches!(store.update(&ghost, "x", &admin()), Err(VaultError::NotFound(_))));
        assert!(matches!(store.delete(&ghost, &admin()), Err(VaultError::NotFound(_))));
        assert!(matches!(store.get_by_path("/nope", &admin()), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_policy_runs_before_lookup() {
        let cipher = EnvelopeCipher::new(EncryptionKey::from_bytes([4u8; 32])).unwrap();
        let deny_all = policy::from_fn(|_, _, _| false);
        let store = SecretStore::new(cipher, InMemoryBackend::new(), deny_all);

        // Nothing exists, yet the caller learns only that it was denied.
        let err = store.get_by_id(&SecretId::generate(), &admin()).unwrap_err();
        assert!(matches!(
            err,
            VaultError::PermissionDenied {
                capability: Capability::Read,
                ..
            }
        ));
        let err = store.get_by_path("", &admin()).unwrap_err();
        assert!(matches!(err, VaultError::PermissionDenied { .. }));
    }

    #[test]
    fn test_invalid_path_is_rejected() {
        let store = store();
        assert!(matches!(
            store.create("  ", "v", &admin()),
            Err(VaultError::ValidationError(_))
        ));
        assert!(store.list_by_prefix("", &admin()).unwrap().is_empty());
    }

    #[test]
    fn test_blank_values_are_rejected() {
        let store = store();
        for blank in ["", "   ", "\n\t"] {
            assert!(matches!(
                store.create("/a", blank, &admin()),
                Err(VaultError::ValidationError(_))
            ));
        }
        assert!(store.list_by_prefix("", &admin()).unwrap().is_empty());

        let created = store.create("/a", "1", &admin()).unwrap();
        assert!(matches!(
            store.update(&created.id, "", &admin()),
            Err(VaultError::ValidationError(_))
        ));
        assert_eq!(store.get_by_id(&created.id, &admin()).unwrap().version, 1);

        // Still denied before any validation.
        assert!(matches!(
            store.create("/b", "", &"guest".into()),
            Err(VaultError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_every_operation_is_journaled() {
        let store = store();
        let created = store.create("/a", "1", &admin()).unwrap();
        store.update(&created.id, "2", &admin()).unwrap();
        let _ = store.delete(&created.id, &"mallory".into());
        store.list_by_prefix("/", &admin()).unwrap();

        let log = store.audit_log();
        let entries: Vec<(Operation, Outcome, Option<u64>)> =
            log.iter().map(|r| (r.operation, r.outcome, r.version)).collect();
        assert_eq!(
            entries,
            vec![
                (Operation::Create, Outcome::Success, Some(1)),
                (Operation::Update, Outcome::Success, Some(2)),
                (Operation::Delete, Outcome::PermissionDenied, None),
                (Operation::ListByPrefix, Outcome::Success, None),
            ]
        );
        let json = serde_json::to_string(&log.iter().collect::<Vec<_>>()).unwrap();
        assert!(!json.contains(created.envelope.as_str()));
    }
}
