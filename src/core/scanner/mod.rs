//! # Scanner Module
//!
//! Discovers photo and video files under the input folder.
//!
//! ## Supported Formats
//! - Images: JPEG, PNG, TIFF, BMP, GIF, WebP, HEIC/HEIF and the common RAW
//!   formats (CR2, NEF, ARW, DNG, ORF, RAW)
//! - Videos: MP4, MOV, M4V, AVI, MKV, WMV, FLV, WebM, 3GP, MTS/M2TS, TS,
//!   VOB, ASF, RM/RMVB
//!
//! ## Example
//! ```rust,ignore
//! use photo_organizer::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let result = scanner.scan(Path::new("/Users/me/Camera Roll"))?;
//! ```

mod filter;
mod walker;

pub use filter::{MediaFilter, SkipReason};
pub use walker::{normalize_path, ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tiff", "tif", "bmp", "gif", "webp", "heic", "heif", "raw", "cr2",
    "nef", "arw", "dng", "orf",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "3gp", "mts", "m2ts", "ts", "vob",
    "asf", "rm", "rmvb",
];

/// Broad media category, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

impl MediaKind {
    /// Classify an extension (without the dot, any case)
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Unknown
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaKind::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, MediaKind::Unknown)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of a scan
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Supported media files, in scan order
    pub files: Vec<PathBuf>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for media scanners
///
/// Implement this trait to feed the pipeline from something other than a
/// directory walk (e.g. in tests).
pub trait MediaScanner: Send + Sync {
    /// Scan a root folder and return the supported files found
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(&self, root: &Path, events: &EventSender)
        -> Result<ScanResult, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_images_and_videos() {
        assert_eq!(MediaKind::from_extension("jpg"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("HEIC"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("dng"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("MOV"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("m2ts"), MediaKind::Video);
    }

    #[test]
    fn unknown_extension_is_not_supported() {
        assert_eq!(MediaKind::from_extension("txt"), MediaKind::Unknown);
        assert!(!MediaKind::Unknown.is_supported());
        assert!(MediaKind::Video.is_supported());
    }

    #[test]
    fn path_without_extension_is_unknown() {
        assert_eq!(MediaKind::from_path(Path::new("/in/README")), MediaKind::Unknown);
        assert_eq!(MediaKind::from_path(Path::new("/in/clip.Mp4")), MediaKind::Video);
    }
}
