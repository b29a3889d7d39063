//! # Metadata Module
//!
//! Works out when a photo or video was taken.
//!
//! ## Resolution order
//! 1. Metadata fields from a [`MetadataSource`] (exiftool, or the embedded
//!    EXIF reader when exiftool is not installed)
//! 2. A date pattern in the filename
//! 3. The filesystem creation time, when the run is configured with
//!    `use_ctime`
//!
//! Every failure along the way just means "no date from this step". A file
//! that yields nothing is resolved as [`ResolutionMethod::Unknown`].

mod exif_date;
mod filename;
mod source;

pub use exif_date::{date_from_fields, merge_subseconds, parse_timestamp, DATE_FIELDS};
pub use filename::date_from_filename;
pub use source::{default_source, EmbeddedExifSource, ExifToolSource, FieldMap, MetadataSource};

use crate::core::config::UnknownDateStrategy;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Where a resolved date came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolutionMethod {
    /// A metadata field, by name
    Exif(String),
    Filename,
    FileCtime,
    Unknown,
}

impl std::fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionMethod::Exif(field) => write!(f, "exif_{}", field),
            ResolutionMethod::Filename => write!(f, "filename"),
            ResolutionMethod::FileCtime => write!(f, "file_ctime"),
            ResolutionMethod::Unknown => write!(f, "unknown"),
        }
    }
}

/// A resolved date plus its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateResolution {
    pub date: Option<NaiveDateTime>,
    pub method: ResolutionMethod,
}

impl DateResolution {
    pub fn unknown() -> Self {
        Self {
            date: None,
            method: ResolutionMethod::Unknown,
        }
    }
}

/// Resolves capture dates with the metadata → filename → ctime chain
pub struct MetadataResolver {
    source: Box<dyn MetadataSource>,
    unknown_strategy: UnknownDateStrategy,
}

impl MetadataResolver {
    pub fn new(source: Box<dyn MetadataSource>, unknown_strategy: UnknownDateStrategy) -> Self {
        Self {
            source,
            unknown_strategy,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Resolve a file's date, reading its creation time from disk if needed.
    pub fn resolve(&self, path: &Path) -> DateResolution {
        self.resolve_with_ctime(path, file_creation_time(path))
    }

    /// Resolve a file's date with an already-known creation time.
    pub fn resolve_with_ctime(&self, path: &Path, ctime: Option<NaiveDateTime>) -> DateResolution {
        if let Some((date, field)) = self.from_metadata(path) {
            trace!(path = %path.display(), field, "Date from metadata");
            return DateResolution {
                date: Some(date),
                method: ResolutionMethod::Exif(field.to_string()),
            };
        }

        let from_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(date_from_filename);
        if let Some(date) = from_name {
            trace!(path = %path.display(), "Date from filename");
            return DateResolution {
                date: Some(date),
                method: ResolutionMethod::Filename,
            };
        }

        match (self.unknown_strategy, ctime) {
            (UnknownDateStrategy::UseCtime, Some(ctime)) => DateResolution {
                date: Some(ctime),
                method: ResolutionMethod::FileCtime,
            },
            _ => DateResolution::unknown(),
        }
    }

    fn from_metadata(&self, path: &Path) -> Option<(NaiveDateTime, &'static str)> {
        match self.source.read_fields(path) {
            Ok(fields) => date_from_fields(&fields),
            Err(e) => {
                debug!(source = self.source.name(), error = %e, "No metadata");
                None
            }
        }
    }
}

/// The file's birth time in local time, or its modification time on
/// platforms that don't record one.
pub fn file_creation_time(path: &Path) -> Option<NaiveDateTime> {
    let metadata = fs::metadata(path).ok()?;
    let time = metadata.created().or_else(|_| metadata.modified()).ok()?;
    Some(DateTime::<Local>::from(time).naive_local())
}
