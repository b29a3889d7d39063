//! # Error Module
//!
//! Error types for the photo organizer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file errors stay per-file** - only configuration problems and
//!   unreadable input roots abort a run
//! - **Recovery hints** - suggest how to fix when possible

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Fingerprint database error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid date_format '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Invalid {field}: '{value}'. Valid values: {expected}")]
    InvalidChoice {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Configuration validation failed:\n  - {}", .errors.join("\n  - "))]
    Invalid { errors: Vec<String> },

    #[error("Cannot create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while scanning the input folder
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the external metadata source.
///
/// These never abort a run; the resolver downgrades them to "no date".
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata tool could not be started ({program}): {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata tool timed out after {seconds}s on {path}")]
    Timeout { path: PathBuf, seconds: u64 },

    #[error("Metadata tool exited with {status} on {path}: {stderr}")]
    ExitStatus {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("Unreadable metadata output for {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while computing a content hash
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to read {path} for hashing: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur with the fingerprint database
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to serialize fingerprint database: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write fingerprint database {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to back up fingerprint database {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fingerprint database at {path} is corrupted. Delete this file and try again.")]
    Corrupted { path: PathBuf },
}

/// Errors from a single copy operation
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Already processed in this run: {path}")]
    AlreadyProcessed { path: PathBuf },

    #[error("Source file no longer exists: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to create destination folder {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {path} after {attempts} attempts: {source}")]
    CopyFailed {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy reported success but {path} does not exist")]
    VerificationFailed { path: PathBuf },
}

impl TransferError {
    /// Whether this failure means "nothing to do" rather than a real error
    pub fn is_skip(&self) -> bool {
        matches!(self, TransferError::AlreadyProcessed { .. })
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        assert!(error.to_string().contains("/photos/vacation"));
    }

    #[test]
    fn invalid_config_lists_every_error() {
        let error = ConfigError::Invalid {
            errors: vec![
                "Missing required field: input_folder".to_string(),
                "Missing required field: output_folder".to_string(),
            ],
        };
        let message = error.to_string();
        assert!(message.contains("input_folder"));
        assert!(message.contains("output_folder"));
    }

    #[test]
    fn fingerprint_error_suggests_recovery() {
        let error = FingerprintError::Corrupted {
            path: PathBuf::from("/fp/fingerprints_sha256.json"),
        };
        assert!(error.to_string().contains("Delete this file"));
    }

    #[test]
    fn already_processed_is_a_skip() {
        let skip = TransferError::AlreadyProcessed {
            path: PathBuf::from("/in/a.jpg"),
        };
        let missing = TransferError::SourceMissing {
            path: PathBuf::from("/in/a.jpg"),
        };
        assert!(skip.is_skip());
        assert!(!missing.is_skip());
    }
}
