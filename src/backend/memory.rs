//! In-process backend.
//!
//! Records live in a map keyed by id, with a sorted path index beside it.
//! Both sit behind one lock, so the uniqueness check and the insert in
//! `save` cannot interleave with another writer.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::{BackendError, BackendResult, PersistenceBackend};
use crate::record::{SecretId, SecretRecord};

#[derive(Default)]
struct Index {
    records: HashMap<SecretId, SecretRecord>,
    paths: BTreeMap<String, SecretId>,
}

/// Reference `PersistenceBackend` held entirely in memory.
#[derive(Default)]
pub struct InMemoryBackend {
    index: RwLock<Index>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> BackendResult<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> BackendResult<bool> {
        Ok(self.read()?.records.is_empty())
    }

    fn read(&self) -> BackendResult<RwLockReadGuard<'_, Index>> {
        self.index
            .read()
            .map_err(|_| BackendError::Unavailable("index lock poisoned".into()))
    }

    fn write(&self) -> BackendResult<RwLockWriteGuard<'_, Index>> {
        self.index
            .write()
            .map_err(|_| BackendError::Unavailable("index lock poisoned".into()))
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("records", &self.len().ok())
            .finish()
    }
}

impl PersistenceBackend for InMemoryBackend {
    fn find_by_id(&self, id: &SecretId) -> BackendResult<Option<SecretRecord>> {
        Ok(self.read()?.records.get(id).cloned())
    }

    fn find_by_path(&self, path: &str) -> BackendResult<Option<SecretRecord>> {
        let index = self.read()?;
        Ok(index
            .paths
            .get(path)
            .and_then(|id| index.records.get(id))
            .cloned())
    }

    fn save(&self, record: SecretRecord) -> BackendResult<SecretRecord> {
        let mut index = self.write()?;

        if let Some(owner) = index.paths.get(&record.path) {
            if *owner != record.id {
                return Err(BackendError::DuplicatePath(record.path));
            }
        }

        // Replacing under a new path frees the old one.
        let old_path = index
            .records
            .get(&record.id)
            .filter(|existing| existing.path != record.path)
            .map(|existing| existing.path.clone());
        if let Some(old_path) = old_path {
            index.paths.remove(&old_path);
        }

        index.paths.insert(record.path.clone(), record.id);
        index.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn modify(
        &self,
        id: &SecretId,
        change: &mut dyn FnMut(&mut SecretRecord),
    ) -> BackendResult<Option<SecretRecord>> {
        let mut index = self.write()?;
        let Some(record) = index.records.get_mut(id) else {
            return Ok(None);
        };

        let (fixed_id, fixed_path) = (record.id, record.path.clone());
        change(record);
        record.id = fixed_id;
        record.path = fixed_path;

        Ok(Some(record.clone()))
    }

    fn delete_by_id(&self, id: &SecretId) -> BackendResult<bool> {
        let mut index = self.write()?;
        match index.records.remove(id) {
            Some(record) => {
                index.paths.remove(&record.path);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn exists_by_id(&self, id: &SecretId) -> BackendResult<bool> {
        Ok(self.read()?.records.contains_key(id))
    }

    fn find_by_path_prefix(&self, prefix: &str) -> BackendResult<Vec<SecretRecord>> {
        let index = self.read()?;
        let matches = index
            .paths
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(prefix))
            .filter_map(|(_, id)| index.records.get(id).cloned())
            .collect();
        Ok(matches)
    }
}
