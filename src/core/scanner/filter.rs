//! Per-file checks run before a file is processed.

use super::MediaKind;
use std::fs::{self, File, Metadata};
use std::path::Path;

/// Why a file was not processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Missing,
    NotAFile,
    Unsupported,
    TooLarge { size: u64, limit: u64 },
    Unreadable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Missing => write!(f, "file does not exist"),
            SkipReason::NotAFile => write!(f, "not a regular file"),
            SkipReason::Unsupported => write!(f, "unsupported file type"),
            SkipReason::TooLarge { size, limit } => {
                write!(f, "file too large ({} bytes, limit {} bytes)", size, limit)
            }
            SkipReason::Unreadable(reason) => write!(f, "cannot read file: {}", reason),
        }
    }
}

/// Decides whether a scanned file may be processed
#[derive(Debug, Clone)]
pub struct MediaFilter {
    max_size_bytes: u64,
}

impl MediaFilter {
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    /// Check a file and return its metadata when it can be processed.
    pub fn validate(&self, path: &Path) -> Result<Metadata, SkipReason> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(SkipReason::Missing),
            Err(e) => return Err(SkipReason::Unreadable(e.to_string())),
        };

        if !metadata.is_file() {
            return Err(SkipReason::NotAFile);
        }

        if !MediaKind::from_path(path).is_supported() {
            return Err(SkipReason::Unsupported);
        }

        if metadata.len() > self.max_size_bytes {
            return Err(SkipReason::TooLarge {
                size: metadata.len(),
                limit: self.max_size_bytes,
            });
        }

        File::open(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;

        Ok(metadata)
    }
}
