//! JSON-backed fingerprint store.

use super::{
    ContentHasher, FingerprintDocument, FingerprintEntry, FingerprintStats, HashAlgorithmKind,
    STORE_VERSION,
};
use crate::error::FingerprintError;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, error, info, warn};

/// Content digest → last known copy.
///
/// Loaded once per run, mutated in memory, written back with [`save`].
///
/// [`save`]: FingerprintStore::save
pub struct FingerprintStore {
    path: PathBuf,
    hasher: ContentHasher,
    entries: BTreeMap<String, FingerprintEntry>,
}

impl FingerprintStore {
    /// File name used for an algorithm, e.g. `fingerprints_sha256.json`
    pub fn file_name(algorithm: HashAlgorithmKind) -> String {
        format!("fingerprints_{}.json", algorithm)
    }

    /// An empty store that will save into `folder`. Nothing is read.
    pub fn new(folder: &Path, algorithm: HashAlgorithmKind) -> Self {
        Self {
            path: folder.join(Self::file_name(algorithm)),
            hasher: ContentHasher::new(algorithm),
            entries: BTreeMap::new(),
        }
    }

    /// Load the store for `algorithm` from `folder`.
    ///
    /// A missing file gives an empty store; so does a corrupt one, after
    /// logging. Stale entries are pruned before returning.
    pub fn load(folder: &Path, algorithm: HashAlgorithmKind) -> Self {
        let mut store = Self::new(folder, algorithm);

        match store.read_document() {
            Ok(Some(document)) => {
                if let Some(stored) = document.algorithm.filter(|a| *a != algorithm) {
                    warn!(
                        path = %store.path.display(),
                        stored = %stored,
                        expected = %algorithm,
                        "Fingerprint file was written for another algorithm"
                    );
                }
                store.entries = document.fingerprints;
                info!(
                    count = store.entries.len(),
                    path = %store.path.display(),
                    "Loaded fingerprints"
                );
            }
            Ok(None) => debug!(path = %store.path.display(), "No fingerprint file yet"),
            Err(e) => error!(error = %e, "Starting with an empty fingerprint database"),
        }

        let pruned = store.prune_stale();
        if pruned > 0 {
            info!(pruned, "Removed fingerprints whose files no longer exist");
        }
        store
    }

    fn read_document(&self) -> Result<Option<FingerprintDocument>, FingerprintError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read fingerprint file");
                return Err(FingerprintError::Corrupted {
                    path: self.path.clone(),
                });
            }
        };

        serde_json::from_str(&text).map(Some).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Invalid fingerprint JSON");
            FingerprintError::Corrupted {
                path: self.path.clone(),
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    pub fn algorithm(&self) -> HashAlgorithmKind {
        self.hasher.algorithm()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, digest: &str) -> Option<&FingerprintEntry> {
        self.entries.get(digest)
    }

    /// Drop every entry whose path no longer exists. Returns how many went.
    pub fn prune_stale(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.path.exists());
        before - self.entries.len()
    }

    /// Digest of a file's contents, or `None` (logged) if it can't be read.
    pub fn hash(&self, path: &Path) -> Option<String> {
        match self.hasher.hash_file(path) {
            Ok(digest) => Some(digest),
            Err(e) => {
                warn!(error = %e, "Could not hash file");
                None
            }
        }
    }

    /// Where this content was already copied to, if that copy still exists.
    ///
    /// A stale entry is removed on the way.
    pub fn duplicate_of(&mut self, digest: &str) -> Option<PathBuf> {
        let entry = self.entries.get(digest)?;
        if entry.path.exists() {
            return Some(entry.path.clone());
        }

        debug!(digest, path = %entry.path.display(), "Dropping stale fingerprint");
        self.entries.remove(digest);
        None
    }

    pub fn is_duplicate(&mut self, digest: &str) -> bool {
        self.duplicate_of(digest).is_some()
    }

    /// Remember that `digest` now lives at `path`. Replaces any older entry.
    pub fn record(&mut self, digest: &str, path: &Path) {
        let metadata = fs::metadata(path).ok();
        let entry = FingerprintEntry {
            path: path.to_path_buf(),
            size: metadata.as_ref().map(|m| m.len()),
            modified_time: metadata
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64()),
            algorithm: Some(self.algorithm()),
        };
        self.entries.insert(digest.to_string(), entry);
    }

    /// Write the store to disk.
    ///
    /// The new document goes to a `.json.tmp` file first. The previous file
    /// is renamed to `.json.bak`, then the temporary file takes its place;
    /// if that fails the backup is put back.
    pub fn save(&self) -> Result<(), FingerprintError> {
        let document = FingerprintDocument {
            version: STORE_VERSION.to_string(),
            algorithm: Some(self.algorithm()),
            fingerprint_count: self.entries.len(),
            fingerprints: self.entries.clone(),
        };
        let json = serde_json::to_vec_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| FingerprintError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        let backup = self.backup_path();
        let had_previous = self.path.exists();
        if had_previous {
            if backup.exists() {
                if let Err(e) = fs::remove_file(&backup) {
                    warn!(path = %backup.display(), error = %e, "Could not remove old fingerprint backup");
                }
            }
            fs::rename(&self.path, &backup).map_err(|source| FingerprintError::Backup {
                path: self.path.clone(),
                source,
            })?;
        }

        let temp = self.temp_path();
        let written = write_synced(&temp, &json).and_then(|()| fs::rename(&temp, &self.path));
        match written {
            Ok(()) => {
                info!(
                    count = self.entries.len(),
                    path = %self.path.display(),
                    "Saved fingerprints"
                );
                Ok(())
            }
            Err(source) => {
                error!(path = %self.path.display(), error = %source, "Failed to write fingerprints");
                if temp.is_file() {
                    if let Err(e) = fs::remove_file(&temp) {
                        debug!(path = %temp.display(), error = %e, "Could not remove partial fingerprint file");
                    }
                }
                if had_previous {
                    match fs::rename(&backup, &self.path) {
                        Ok(()) => info!("Restored fingerprint database from backup"),
                        Err(e) => error!(error = %e, "Could not restore fingerprint backup"),
                    }
                }
                Err(FingerprintError::Write {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    pub fn stats(&self) -> FingerprintStats {
        let mut stats = FingerprintStats {
            total_fingerprints: self.entries.len(),
            algorithm: self.algorithm(),
            ..Default::default()
        };

        for entry in self.entries.values() {
            if entry.path.exists() {
                stats.existing_files += 1;
                stats.total_size_bytes += entry.size.unwrap_or(0);
            } else {
                stats.stale_fingerprints += 1;
            }
        }
        stats
    }

    /// Write a JSON report of every fingerprint and whether its file exists.
    pub fn export_report(&self, output: &Path) -> Result<(), FingerprintError> {
        let fingerprints: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(digest, entry)| {
                (
                    digest.clone(),
                    serde_json::json!({
                        "path": entry.path,
                        "exists": entry.path.exists(),
                        "size": entry.size,
                        "modified_time": entry.modified_time,
                    }),
                )
            })
            .collect();

        let report = serde_json::json!({
            "generated_at": chrono::Local::now().to_rfc3339(),
            "database_path": self.path,
            "statistics": self.stats(),
            "fingerprints": fingerprints,
        });

        let to_error = |source| FingerprintError::Write {
            path: output.to_path_buf(),
            source,
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_error)?;
        }
        let json = serde_json::to_vec_pretty(&report)?;
        fs::write(output, json).map_err(to_error)?;

        info!(path = %output.display(), "Exported fingerprint report");
        Ok(())
    }

    /// Check that a file's current contents hash to `expected`.
    pub fn verify(&self, path: &Path, expected: &str) -> bool {
        match self.hash(path) {
            Some(actual) if actual.eq_ignore_ascii_case(expected) => true,
            Some(actual) => {
                warn!(
                    path = %path.display(),
                    expected,
                    actual = %actual,
                    "Content hash mismatch"
                );
                false
            }
            None => false,
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_store_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = FingerprintStore::load(temp.path(), HashAlgorithmKind::Sha256);
        assert!(store.is_empty());
        assert!(store.path().ends_with("fingerprints_sha256.json"));
    }

    #[test]
    fn corrupt_store_loads_empty() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "fingerprints_md5.json", b"{ this is not json");

        let store = FingerprintStore::load(temp.path(), HashAlgorithmKind::Md5);
        assert!(store.is_empty());
    }

    #[test]
    fn record_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let photo = write_file(temp.path(), "a.jpg", b"pixels");

        let mut store = FingerprintStore::load(temp.path(), HashAlgorithmKind::Sha256);
        let digest = store.hash(&photo).unwrap();
        store.record(&digest, &photo);
        store.save().unwrap();

        let reloaded = FingerprintStore::load(temp.path(), HashAlgorithmKind::Sha256);
        let entry = reloaded.get(&digest).unwrap();
        assert_eq!(entry.path, photo);
        assert_eq!(entry.size, Some(6));
        assert_eq!(entry.algorithm, Some(HashAlgorithmKind::Sha256));
    }

    #[test]
    fn stale_entries_are_not_duplicates() {
        let temp = TempDir::new().unwrap();
        let photo = write_file(temp.path(), "a.jpg", b"pixels");

        let mut store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Md5);
        let digest = store.hash(&photo).unwrap();
        store.record(&digest, &photo);
        assert!(store.is_duplicate(&digest));

        fs::remove_file(&photo).unwrap();

        assert!(!store.is_duplicate(&digest));
        assert!(store.get(&digest).is_none());
    }

    #[test]
    fn stale_entries_are_pruned_on_load() {
        let temp = TempDir::new().unwrap();
        let kept = write_file(temp.path(), "kept.jpg", b"one");
        let gone = write_file(temp.path(), "gone.jpg", b"two");

        let mut store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Sha1);
        store.record("aaa", &kept);
        store.record("bbb", &gone);
        store.save().unwrap();
        fs::remove_file(&gone).unwrap();

        let reloaded = FingerprintStore::load(temp.path(), HashAlgorithmKind::Sha1);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.get("aaa").is_some());
    }

    #[test]
    fn record_is_last_write_wins() {
        let temp = TempDir::new().unwrap();
        let first = write_file(temp.path(), "first.jpg", b"x");
        let second = write_file(temp.path(), "second.jpg", b"x");

        let mut store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Sha256);
        store.record("same", &first);
        store.record("same", &second);

        assert_eq!(store.len(), 1);
        assert_eq!(store.duplicate_of("same"), Some(second));
    }

    #[test]
    fn save_keeps_previous_file_as_backup() {
        let temp = TempDir::new().unwrap();
        let photo = write_file(temp.path(), "a.jpg", b"pixels");

        let mut store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Sha256);
        store.save().unwrap();
        store.record("abc", &photo);
        store.save().unwrap();

        let backup: FingerprintDocument =
            serde_json::from_str(&fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        let current: FingerprintDocument =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();

        assert_eq!(backup.fingerprint_count, 0);
        assert_eq!(current.fingerprint_count, 1);
        assert_eq!(current.version, STORE_VERSION);
    }

    #[test]
    fn repeated_saves_replace_the_backup() {
        let temp = TempDir::new().unwrap();
        let photo = write_file(temp.path(), "a.jpg", b"pixels");

        let mut store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Sha256);
        store.save().unwrap();
        store.record("abc", &photo);
        store.save().unwrap();
        store.record("def", &photo);
        store.save().unwrap();

        let backup: FingerprintDocument =
            serde_json::from_str(&fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert_eq!(backup.fingerprint_count, 1);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn failed_save_restores_the_previous_file() {
        let temp = TempDir::new().unwrap();
        let photo = write_file(temp.path(), "a.jpg", b"pixels");

        let mut store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Sha256);
        store.record("abc", &photo);
        store.save().unwrap();
        let before = fs::read(store.path()).unwrap();

        // a directory where the new document would be written
        fs::create_dir(store.temp_path()).unwrap();
        store.record("def", &photo);

        assert!(matches!(store.save(), Err(FingerprintError::Write { .. })));
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(!store.backup_path().exists());
    }

    #[test]
    fn stats_count_existing_and_stale() {
        let temp = TempDir::new().unwrap();
        let photo = write_file(temp.path(), "a.jpg", b"12345");

        let mut store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Sha256);
        store.record("present", &photo);
        store.record("missing", &temp.path().join("nope.jpg"));

        let stats = store.stats();
        assert_eq!(stats.total_fingerprints, 2);
        assert_eq!(stats.existing_files, 1);
        assert_eq!(stats.stale_fingerprints, 1);
        assert_eq!(stats.total_size_bytes, 5);
    }

    #[test]
    fn verify_compares_digests() {
        let temp = TempDir::new().unwrap();
        let photo = write_file(temp.path(), "a.jpg", b"pixels");
        let store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Sha256);

        let digest = store.hash(&photo).unwrap();
        assert!(store.verify(&photo, &digest));
        assert!(!store.verify(&photo, "0000"));
    }

    #[test]
    fn export_report_lists_entries() {
        let temp = TempDir::new().unwrap();
        let photo = write_file(temp.path(), "a.jpg", b"pixels");
        let mut store = FingerprintStore::new(temp.path(), HashAlgorithmKind::Sha256);
        store.record("abc", &photo);

        let report_path = temp.path().join("reports/fingerprints.json");
        store.export_report(&report_path).unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["statistics"]["total_fingerprints"], 1);
        assert_eq!(report["fingerprints"]["abc"]["exists"], true);
    }
}
