//! Copying files into the output tree.

use crate::error::TransferError;
use std::collections::HashSet;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Copy attempts before giving up on a file
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// How a successful transfer happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Copied { bytes: u64 },
    /// Dry run: nothing was written
    Simulated,
}

/// Copies files, or pretends to in dry-run mode.
///
/// Each source path is handled at most once per executor.
pub struct TransferExecutor {
    dry_run: bool,
    processed: HashSet<PathBuf>,
}

impl TransferExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            processed: HashSet::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether `source` was already copied (or simulated) by this executor
    pub fn is_processed(&self, source: &Path) -> bool {
        self.processed.contains(source)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Copy `source` to `destination`, creating parent folders.
    ///
    /// Transient I/O failures are retried up to [`MAX_RETRY_ATTEMPTS`]
    /// times. A source that has disappeared is not retried.
    pub fn copy(&mut self, source: &Path, destination: &Path) -> Result<TransferOutcome, TransferError> {
        if self.is_processed(source) {
            debug!(path = %source.display(), "Already processed in this run");
            return Err(TransferError::AlreadyProcessed {
                path: source.to_path_buf(),
            });
        }

        if self.dry_run {
            return self.simulate(source, destination);
        }

        if !source.exists() {
            return Err(TransferError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| TransferError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut last_error: Option<io::Error> = None;
        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            if !source.exists() {
                warn!(path = %source.display(), "Source disappeared before copy");
                return Err(TransferError::SourceMissing {
                    path: source.to_path_buf(),
                });
            }

            match copy_preserving_times(source, destination) {
                Ok(bytes) if destination.exists() => {
                    self.processed.insert(source.to_path_buf());
                    debug!(
                        source = %source.display(),
                        destination = %destination.display(),
                        bytes,
                        "Copied"
                    );
                    return Ok(TransferOutcome::Copied { bytes });
                }
                Ok(_) => {
                    warn!(attempt, path = %destination.display(), "Copy left no file behind");
                    last_error = None;
                }
                Err(e) => {
                    if attempt < MAX_RETRY_ATTEMPTS {
                        warn!(attempt, path = %source.display(), error = %e, "Copy failed, retrying");
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(source_error) => TransferError::CopyFailed {
                path: source.to_path_buf(),
                attempts: MAX_RETRY_ATTEMPTS,
                source: source_error,
            },
            None => TransferError::VerificationFailed {
                path: destination.to_path_buf(),
            },
        })
    }

    fn simulate(&mut self, source: &Path, destination: &Path) -> Result<TransferOutcome, TransferError> {
        let metadata = fs::metadata(source).map_err(|_| TransferError::SourceMissing {
            path: source.to_path_buf(),
        })?;

        info!(
            source = %source.display(),
            destination = %destination.display(),
            bytes = metadata.len(),
            "[DRY RUN] Would copy"
        );
        self.processed.insert(source.to_path_buf());
        Ok(TransferOutcome::Simulated)
    }
}

/// `fs::copy` carries permissions over; access and modification times are
/// copied separately. Failing to set times only loses metadata.
fn copy_preserving_times(source: &Path, destination: &Path) -> io::Result<u64> {
    let bytes = fs::copy(source, destination)?;
    if let Err(e) = copy_times(source, destination) {
        debug!(path = %destination.display(), error = %e, "Could not preserve file times");
    }
    Ok(bytes)
}

fn copy_times(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    File::options()
        .write(true)
        .open(destination)?
        .set_times(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn source_file(temp: &TempDir, contents: &[u8]) -> PathBuf {
        let path = temp.path().join("in/photo.jpg");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn copy_creates_folders_and_keeps_original() {
        let temp = TempDir::new().unwrap();
        let source = source_file(&temp, b"test content");
        let destination = temp.path().join("out/2024/01/photo.jpg");

        let mut executor = TransferExecutor::new(false);
        let outcome = executor.copy(&source, &destination).unwrap();

        assert_eq!(outcome, TransferOutcome::Copied { bytes: 12 });
        assert!(source.exists());
        assert_eq!(fs::read(&destination).unwrap(), b"test content");
    }

    #[test]
    fn copy_preserves_modification_time() {
        let temp = TempDir::new().unwrap();
        let source = source_file(&temp, b"old photo");
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_times(FileTimes::new().set_modified(old))
            .unwrap();

        let destination = temp.path().join("out/photo.jpg");
        TransferExecutor::new(false).copy(&source, &destination).unwrap();

        assert_eq!(fs::metadata(&destination).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn same_source_is_refused_the_second_time() {
        let temp = TempDir::new().unwrap();
        let source = source_file(&temp, b"x");
        let mut executor = TransferExecutor::new(false);

        executor.copy(&source, &temp.path().join("out/a.jpg")).unwrap();
        let again = executor.copy(&source, &temp.path().join("out/b.jpg"));

        assert!(matches!(again, Err(TransferError::AlreadyProcessed { .. })));
        assert!(!temp.path().join("out/b.jpg").exists());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let source = source_file(&temp, b"x");
        let destination = temp.path().join("out/2024/01/a.jpg");

        let mut executor = TransferExecutor::new(true);
        let outcome = executor.copy(&source, &destination).unwrap();

        assert_eq!(outcome, TransferOutcome::Simulated);
        assert!(!temp.path().join("out").exists());
        assert_eq!(executor.processed_count(), 1);
    }

    #[test]
    fn missing_source_fails_without_retry() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("in/gone.jpg");

        for dry_run in [false, true] {
            let result = TransferExecutor::new(dry_run).copy(&missing, &temp.path().join("out/gone.jpg"));
            assert!(matches!(result, Err(TransferError::SourceMissing { .. })));
        }
    }

    #[test]
    fn persistent_copy_failure_gives_up_after_all_attempts() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("in/not_a_file.jpg");
        fs::create_dir_all(&folder).unwrap();

        let mut executor = TransferExecutor::new(false);
        let result = executor.copy(&folder, &temp.path().join("out/a.jpg"));

        assert!(matches!(
            result,
            Err(TransferError::CopyFailed { attempts: MAX_RETRY_ATTEMPTS, .. })
        ));
        assert!(!executor.is_processed(&folder));
        assert!(!temp.path().join("out/a.jpg").exists());
    }
}
