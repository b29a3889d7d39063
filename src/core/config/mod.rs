//! # Config Module
//!
//! Run configuration: the JSON document as read from disk, CLI overrides,
//! and the validated, immutable [`OrganizeConfig`] every component is built
//! from.
//!
//! ```rust,ignore
//! let (config, warnings) = ConfigLoader::load_and_validate(Some(path), &overrides)?;
//! let pipeline = OrganizePipeline::builder(config).build();
//! ```

mod loader;
mod template;
mod validator;

pub use loader::{CliOverrides, ConfigLoader};
pub use template::{DateTemplate, DEFAULT_DATE_FORMAT, RESERVED_CHARS};
pub use validator::{ConfigValidator, ValidationReport};

use crate::core::fingerprint::HashAlgorithmKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FINGERPRINT_FOLDER: &str = "fingerprints";
pub const DEFAULT_LOG_PATH: &str = "photo_organizer.log";
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 1024;
pub const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DETAIL_LOG_LIMIT: usize = 10;
pub const MAX_VERBOSITY: u8 = 3;

/// Where log output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    #[default]
    Console,
    File,
    Both,
}

impl LogMode {
    pub const VALID_VALUES: &'static str = "console, file, both";

    pub fn as_str(&self) -> &'static str {
        match self {
            LogMode::Console => "console",
            LogMode::File => "file",
            LogMode::Both => "both",
        }
    }

    pub fn writes_console(&self) -> bool {
        matches!(self, LogMode::Console | LogMode::Both)
    }

    pub fn writes_file(&self) -> bool {
        matches!(self, LogMode::File | LogMode::Both)
    }
}

/// What to do when the destination path is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Append `_HHMMSS_NNN`
    #[default]
    TimestampSuffix,
    /// Append a short random token
    UuidSuffix,
    /// Replace the existing file
    Overwrite,
}

impl ConflictPolicy {
    pub const VALID_VALUES: &'static str = "timestamp_suffix, uuid_suffix, overwrite";

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::TimestampSuffix => "timestamp_suffix",
            ConflictPolicy::UuidSuffix => "uuid_suffix",
            ConflictPolicy::Overwrite => "overwrite",
        }
    }
}

/// How to place files without a usable date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownDateStrategy {
    /// `output/unknown/<relative subdir>`
    #[default]
    RouteToUnknown,
    /// Fall back to the filesystem creation time
    UseCtime,
}

impl UnknownDateStrategy {
    pub const VALID_VALUES: &'static str = "route_to_unknown, use_ctime";

    pub fn as_str(&self) -> &'static str {
        match self {
            UnknownDateStrategy::RouteToUnknown => "route_to_unknown",
            UnknownDateStrategy::UseCtime => "use_ctime",
        }
    }
}

macro_rules! choice_impls {
    ($ty:ty, $field:literal, [$($variant:expr),+ $(,)?]) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let wanted = value.trim().to_ascii_lowercase();
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| ConfigError::InvalidChoice {
                        field: $field,
                        value: value.to_string(),
                        expected: <$ty>::VALID_VALUES,
                    })
            }
        }
    };
}

choice_impls!(LogMode, "log_mode", [LogMode::Console, LogMode::File, LogMode::Both]);
choice_impls!(
    ConflictPolicy,
    "filename_conflict_resolution",
    [
        ConflictPolicy::TimestampSuffix,
        ConflictPolicy::UuidSuffix,
        ConflictPolicy::Overwrite,
    ]
);
choice_impls!(
    UnknownDateStrategy,
    "unknown_strategy",
    [UnknownDateStrategy::RouteToUnknown, UnknownDateStrategy::UseCtime]
);

/// Logging setup derived from the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub mode: LogMode,
    pub path: Option<PathBuf>,
    pub verbosity: u8,
}

impl LogSettings {
    /// `tracing` level directive for the configured verbosity
    pub fn level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            mode: LogMode::Console,
            path: None,
            verbosity: 0,
        }
    }
}

/// Validated configuration for one run. Never mutated once built.
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    pub fingerprint_folder: PathBuf,
    pub date_template: DateTemplate,
    pub unknown_strategy: UnknownDateStrategy,
    pub conflict_policy: ConflictPolicy,
    pub scan_nested: bool,
    pub include_hidden: bool,
    pub hash_algorithm: HashAlgorithmKind,
    pub max_file_size_mb: u64,
    pub dry_run: bool,
    pub metadata_timeout: Duration,
    pub exiftool_path: Option<PathBuf>,
    pub detail_log_limit: usize,
    /// Flush the fingerprint store every N successful copies (0 = only at the end)
    pub checkpoint_interval: usize,
    pub verify_copies: bool,
    pub logging: LogSettings,
}

impl OrganizeConfig {
    /// Configuration with default settings for the given folders.
    ///
    /// The fingerprint folder defaults to `fingerprints` inside the output
    /// folder.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output_folder = output.into();
        Self {
            input_folder: input.into(),
            fingerprint_folder: output_folder.join(DEFAULT_FINGERPRINT_FOLDER),
            output_folder,
            date_template: DateTemplate::default(),
            unknown_strategy: UnknownDateStrategy::default(),
            conflict_policy: ConflictPolicy::default(),
            scan_nested: true,
            include_hidden: false,
            hash_algorithm: HashAlgorithmKind::default(),
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            dry_run: false,
            metadata_timeout: Duration::from_secs(DEFAULT_METADATA_TIMEOUT_SECS),
            exiftool_path: None,
            detail_log_limit: DEFAULT_DETAIL_LOG_LIMIT,
            checkpoint_interval: 0,
            verify_copies: false,
            logging: LogSettings::default(),
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn input_folder(&self) -> &Path {
        &self.input_folder
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }
}

/// The configuration document as written on disk.
///
/// Every field is optional; unknown keys are ignored. Enum-valued fields
/// stay strings here so validation can report every bad value at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub input_folder: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub fingerprint_folder: PathBuf,
    pub date_format: String,
    pub log_path: Option<PathBuf>,
    pub log_mode: String,
    pub dry_run: bool,
    pub unknown_strategy: String,
    pub scan_nested: bool,
    pub include_hidden: bool,
    pub hash_algorithm: String,
    pub filename_conflict_resolution: String,
    pub verbose: i64,
    pub max_file_size_mb: i64,
    pub metadata_timeout_secs: i64,
    pub exiftool_path: Option<PathBuf>,
    pub detail_log_limit: usize,
    pub checkpoint_interval: usize,
    pub verify_copies: bool,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            input_folder: None,
            output_folder: None,
            fingerprint_folder: PathBuf::from(DEFAULT_FINGERPRINT_FOLDER),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            log_path: Some(PathBuf::from(DEFAULT_LOG_PATH)),
            log_mode: LogMode::default().as_str().to_string(),
            dry_run: false,
            unknown_strategy: UnknownDateStrategy::default().as_str().to_string(),
            scan_nested: true,
            include_hidden: false,
            hash_algorithm: HashAlgorithmKind::default().as_str().to_string(),
            filename_conflict_resolution: ConflictPolicy::default().as_str().to_string(),
            verbose: 0,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB as i64,
            metadata_timeout_secs: DEFAULT_METADATA_TIMEOUT_SECS as i64,
            exiftool_path: None,
            detail_log_limit: DEFAULT_DETAIL_LOG_LIMIT,
            checkpoint_interval: 0,
            verify_copies: false,
        }
    }
}
