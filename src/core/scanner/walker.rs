//! Directory walking implementation using walkdir.

use super::{MediaKind, MediaScanner, ScanResult};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent, ScanProgress};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Descend into subfolders (false = top level only)
    pub nested: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Folders never descended into (the output and fingerprint folders)
    pub exclude: Vec<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            nested: true,
            include_hidden: false,
            follow_symlinks: false,
            exclude: Vec::new(),
        }
    }
}

/// Scanner implementation using the walkdir crate.
///
/// Walks depth-first with entries sorted by file name inside each
/// directory, so two scans of the same tree yield the same order.
pub struct WalkDirScanner {
    config: ScanConfig,
}

impl WalkDirScanner {
    /// Excluded folders are resolved to their canonical form here, so a
    /// folder named through `..` or a symlink still matches.
    pub fn new(mut config: ScanConfig) -> Self {
        config.exclude = config.exclude.iter().map(|dir| normalize_path(dir)).collect();
        Self { config }
    }

    fn is_hidden(entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with('.'))
                .unwrap_or(false)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() || self.config.exclude.is_empty() {
            return false;
        }
        let path = normalize_path(entry.path());
        self.config.exclude.iter().any(|dir| *dir == path)
    }

    fn to_scan_error(error: walkdir::Error) -> ScanError {
        let path = error.path().map(Path::to_path_buf).unwrap_or_default();
        if error.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
            return ScanError::PermissionDenied { path };
        }
        let source = error
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
        ScanError::ReadDirectory { path, source }
    }
}

/// Canonical form of a path that may not exist yet: the longest existing
/// ancestor is canonicalized and the rest appended as given.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => normalize_path(parent).join(name),
        _ => path.to_path_buf(),
    }
}

impl MediaScanner for WalkDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &crate::events::null_sender())
    }

    fn scan_with_events(&self, root: &Path, events: &EventSender) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        if !self.config.nested {
            walker = walker.max_depth(1);
        }

        let include_hidden = self.config.include_hidden;
        let entries = walker
            .into_iter()
            .filter_entry(|entry| {
                (include_hidden || !Self::is_hidden(entry)) && !self.is_excluded(entry)
            });

        let mut result = ScanResult::default();
        let mut directories_scanned = 0;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = Self::to_scan_error(e);
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    result.errors.push(error);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                directories_scanned += 1;
                events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    directories_scanned,
                    files_found: result.files.len(),
                    current_path: entry.path().to_path_buf(),
                })));
                continue;
            }

            if !entry.file_type().is_file() && !entry.path().is_file() {
                continue;
            }

            if MediaKind::from_path(entry.path()).is_supported() {
                result.files.push(entry.into_path());
            }
        }

        tracing::info!(
            root = %root.display(),
            files = result.files.len(),
            errors = result.errors.len(),
            "Scan complete"
        );
        events.send(Event::Scan(ScanEvent::Completed {
            total_files: result.files.len(),
        }));

        Ok(result)
    }
}
