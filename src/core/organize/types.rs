//! Types for the organize module.

use crate::core::fingerprint::FingerprintStore;
use crate::core::metadata::{DateResolution, ResolutionMethod};
use crate::core::scanner::MediaKind;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One file on its way through the pipeline
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub kind: MediaKind,
    pub modified: Option<SystemTime>,
    /// Filesystem creation time (modification time where unavailable)
    pub created: Option<NaiveDateTime>,
    pub date: Option<NaiveDateTime>,
    pub method: ResolutionMethod,
    content_hash: OnceCell<Option<String>>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        Self {
            kind: MediaKind::from_path(&path),
            path,
            size,
            modified: None,
            created: None,
            date: None,
            method: ResolutionMethod::Unknown,
            content_hash: OnceCell::new(),
        }
    }

    /// Build a record from a `stat` of the file.
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let modified = metadata.modified().ok();
        let created = metadata
            .created()
            .ok()
            .or(modified)
            .map(|t| DateTime::<Local>::from(t).naive_local());

        Self {
            modified,
            created,
            ..Self::new(path, metadata.len())
        }
    }

    pub fn with_resolution(mut self, resolution: DateResolution) -> Self {
        self.date = resolution.date;
        self.method = resolution.method;
        self
    }

    pub fn is_dated(&self) -> bool {
        self.date.is_some()
    }

    /// Content digest, computed on first use and cached for the record's
    /// lifetime. A failed hash is cached too.
    pub fn content_hash(&self, store: &FingerprintStore) -> Option<&str> {
        self.content_hash
            .get_or_init(|| store.hash(&self.path))
            .as_deref()
    }
}

/// Final state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Copied,
    Duplicate,
    Skipped,
    Error,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Copied => write!(f, "copied"),
            OperationStatus::Duplicate => write!(f, "duplicate"),
            OperationStatus::Skipped => write!(f, "skipped"),
            OperationStatus::Error => write!(f, "error"),
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub status: OperationStatus,
    /// Resolution method tag, when the file got that far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl OperationRecord {
    fn new(source: &Path, status: OperationStatus) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: None,
            status,
            method: None,
            detail: None,
        }
    }

    pub fn copied(source: &Path, destination: &Path, method: &ResolutionMethod) -> Self {
        Self {
            destination: Some(destination.to_path_buf()),
            method: Some(method.to_string()),
            ..Self::new(source, OperationStatus::Copied)
        }
    }

    /// `original` is where the same content already lives
    pub fn duplicate(source: &Path, original: Option<&Path>) -> Self {
        Self {
            detail: original.map(|p| format!("duplicate of {}", p.display())),
            ..Self::new(source, OperationStatus::Duplicate)
        }
    }

    pub fn skipped(source: &Path, reason: impl Into<String>) -> Self {
        Self {
            detail: Some(reason.into()),
            ..Self::new(source, OperationStatus::Skipped)
        }
    }

    pub fn error(source: &Path, message: impl Into<String>) -> Self {
        Self {
            detail: Some(message.into()),
            ..Self::new(source, OperationStatus::Error)
        }
    }

    pub fn with_destination(mut self, destination: &Path) -> Self {
        self.destination = Some(destination.to_path_buf());
        self
    }
}

/// Counts of every outcome plus a bounded log of individual operations.
///
/// Only the first `detail_limit` operations are kept in full; beyond that
/// only the counters grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub copied: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub errors: usize,
    /// Copied files that had no usable date
    pub unknown: usize,
    pub total_operations: usize,
    pub operations: Vec<OperationRecord>,
    #[serde(skip)]
    detail_limit: usize,
}

impl OperationSummary {
    pub fn with_detail_limit(detail_limit: usize) -> Self {
        Self {
            detail_limit,
            ..Default::default()
        }
    }

    pub fn record(&mut self, operation: OperationRecord) {
        match operation.status {
            OperationStatus::Copied => self.copied += 1,
            OperationStatus::Duplicate => self.duplicates += 1,
            OperationStatus::Skipped => self.skipped += 1,
            OperationStatus::Error => self.errors += 1,
        }
        self.total_operations += 1;
        if self.operations.len() < self.detail_limit {
            self.operations.push(operation);
        }
    }

    pub fn mark_unknown_date(&mut self) {
        self.unknown += 1;
    }

    pub fn detail_limit(&self) -> usize {
        self.detail_limit
    }

    /// Whether some operations were counted but not kept in the log
    pub fn is_truncated(&self) -> bool {
        self.total_operations > self.operations.len()
    }
}
