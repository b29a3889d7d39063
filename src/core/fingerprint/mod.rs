//! # Fingerprint Module
//!
//! Remembers the content hash of every file copied into the output tree so
//! the same photo is never copied twice, within a run or across runs.
//!
//! ## On-disk format
//! `<fingerprint_folder>/fingerprints_<algorithm>.json`:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "algorithm": "sha256",
//!   "fingerprint_count": 1,
//!   "fingerprints": {
//!     "9f86d0...": {
//!       "path": "/out/2024/07/2024-07-16 at 18-22-07 (123).jpg",
//!       "size": 2481123,
//!       "modified_time": 1721146927.0,
//!       "algorithm": "sha256"
//!     }
//!   }
//! }
//! ```
//!
//! An entry whose path no longer exists is stale: it is dropped rather than
//! trusted.

mod hasher;
mod store;

pub use hasher::{ContentHasher, HashAlgorithmKind, HASH_BUFFER_SIZE};
pub use store::FingerprintStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Version written to new fingerprint files
pub const STORE_VERSION: &str = "1.0";

/// Where a piece of content was last copied to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub size: Option<u64>,
    /// Seconds since the Unix epoch
    #[serde(default, alias = "timestamp")]
    pub modified_time: Option<f64>,
    #[serde(default)]
    pub algorithm: Option<HashAlgorithmKind>,
}

/// The whole fingerprint file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FingerprintDocument {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub algorithm: Option<HashAlgorithmKind>,
    #[serde(default)]
    pub fingerprint_count: usize,
    #[serde(default)]
    pub fingerprints: BTreeMap<String, FingerprintEntry>,
}

/// Store health at a glance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FingerprintStats {
    pub total_fingerprints: usize,
    pub existing_files: usize,
    pub stale_fingerprints: usize,
    pub total_size_bytes: u64,
    pub algorithm: HashAlgorithmKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_without_fingerprints_is_empty() {
        let document: FingerprintDocument =
            serde_json::from_str(r#"{"version": "1.0", "extra": [1, 2, 3]}"#).unwrap();
        assert!(document.fingerprints.is_empty());
    }

    #[test]
    fn legacy_timestamp_key_is_read_as_modified_time() {
        let document: FingerprintDocument = serde_json::from_str(
            r#"{"fingerprints": {"abc": {"path": "/out/a.jpg", "timestamp": 1700000000.5, "metadata": {}}}}"#,
        )
        .unwrap();

        let entry = &document.fingerprints["abc"];
        assert_eq!(entry.modified_time, Some(1_700_000_000.5));
        assert_eq!(entry.size, None);
    }
}
