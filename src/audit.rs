//! Operation journal.
//!
//! Records every store operation, allowed or not. Records carry who, what
//! and the outcome, never a plaintext or an envelope. The in-memory log is
//! a bounded window of recent operations; pluggable sinks receive every
//! record for files or other stores.

use std::collections::{vec_deque, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// A sink that receives audit records.
pub trait AuditSink: Send {
    /// Append a record. Called once per store operation.
    fn append(&mut self, record: AuditRecord);
}

/// Which store operation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    GetById,
    GetByPath,
    Update,
    Delete,
    ListByPrefix,
}

/// How the operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    ValidationError,
    EncryptionFailure,
    StorageFailure,
}

impl From<&VaultError> for Outcome {
    fn from(err: &VaultError) -> Self {
        match err {
            VaultError::PermissionDenied { .. } => Self::PermissionDenied,
            VaultError::NotFound(_) => Self::NotFound,
            VaultError::AlreadyExists(_) => Self::AlreadyExists,
            VaultError::ValidationError(_) => Self::ValidationError,
            VaultError::EncryptionFailure | VaultError::InvalidKey(_) => Self::EncryptionFailure,
            VaultError::Storage(_) => Self::StorageFailure,
        }
    }
}

/// A permanent record of one store operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub operation: Operation,
    /// The calling principal.
    pub principal: String,
    /// The path, id or prefix the operation addressed.
    pub target: String,
    pub outcome: Outcome,
    /// Version of the record after the operation, where one applies.
    pub version: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Records kept in memory by default.
pub const DEFAULT_RETENTION: usize = 1024;

/// The most recent store operations, oldest first.
///
/// Holds at most `retention` records; appending past that evicts the oldest.
/// Attach an `AuditSink` to keep the full history somewhere durable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    records: VecDeque<AuditRecord>,
    #[serde(skip, default = "default_retention")]
    retention: usize,
    #[serde(skip)]
    evicted: u64,
}

fn default_retention() -> usize {
    DEFAULT_RETENTION
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that keeps at most `retention` records. Zero keeps none.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(retention.min(DEFAULT_RETENTION)),
            retention,
            evicted: 0,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Append a record, evicting the oldest ones beyond the retention limit.
    pub fn append(&mut self, record: AuditRecord) {
        self.records.push_back(record);
        while self.records.len() > self.retention {
            self.records.pop_front();
            self.evicted += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// How many records have been dropped to stay within the limit.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, AuditRecord> {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes audit records as JSON lines (one per record) to a file.
/// Creates the file if it doesn't exist; appends if it does.
pub struct FileAuditSink {
    file: std::fs::File,
}

impl FileAuditSink {
    /// Open or create a file for append-only audit logging.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) {
        let written = serde_json::to_string(&record)
            .map_err(std::io::Error::from)
            .and_then(|line| {
                writeln!(self.file, "{line}")?;
                self.file.flush()
            });
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to write audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(operation: Operation, outcome: Outcome) -> AuditRecord {
        AuditRecord {
            operation,
            principal: "admin".into(),
            target: "path:/a".into(),
            outcome,
            version: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_iterate() {
        let mut log = AuditLog::new();
        assert!(log.is_empty());
        log.append(record(Operation::Create, Outcome::Success));
        log.append(record(Operation::Delete, Outcome::PermissionDenied));

        let ops: Vec<Operation> = log.iter().map(|r| r.operation).collect();
        assert_eq!(ops, vec![Operation::Create, Operation::Delete]);
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let mut log = AuditLog::with_retention(2);
        log.append(record(Operation::Create, Outcome::Success));
        log.append(record(Operation::Update, Outcome::Success));
        log.append(record(Operation::Delete, Outcome::Success));

        assert_eq!(log.len(), 2);
        assert_eq!(log.evicted(), 1);
        let ops: Vec<Operation> = log.iter().map(|r| r.operation).collect();
        assert_eq!(ops, vec![Operation::Update, Operation::Delete]);
    }

    #[test]
    fn test_zero_retention_keeps_nothing() {
        let mut log = AuditLog::with_retention(0);
        log.append(record(Operation::Create, Outcome::Success));
        assert!(log.is_empty());
        assert_eq!(log.evicted(), 1);
    }

    #[test]
    fn test_outcome_from_error() {
        assert_eq!(
            Outcome::from(&VaultError::AlreadyExists("/a".into())),
            Outcome::AlreadyExists
        );
        assert_eq!(
            Outcome::from(&VaultError::EncryptionFailure),
            Outcome::EncryptionFailure
        );
    }

    #[test]
    fn test_record_serializes_snake_case() {
        let json = serde_json::to_string(&record(Operation::ListByPrefix, Outcome::NotFound)).unwrap();
        assert!(json.contains("\"operation\":\"list_by_prefix\""));
        assert!(json.contains("\"outcome\":\"not_found\""));
    }
}
