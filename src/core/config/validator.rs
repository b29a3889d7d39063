//! Configuration validation.
//!
//! Every problem is collected before failing so the user can fix them all
//! in one go.

use super::{
    ConfigDocument, ConflictPolicy, DateTemplate, LogMode, LogSettings, OrganizeConfig,
    UnknownDateStrategy, MAX_VERBOSITY,
};
use crate::core::fingerprint::HashAlgorithmKind;
use crate::core::scanner::{normalize_path, MediaKind};
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use walkdir::WalkDir;

const LARGE_FILE_SIZE_WARNING_MB: i64 = 10 * 1024;

/// Errors and warnings gathered while checking a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record the outcome of parsing one field, keeping the value on success.
    fn check<T>(&mut self, parsed: Result<T, ConfigError>) -> Option<T> {
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                self.error(e.to_string());
                None
            }
        }
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a (merged, path-resolved) document and build the run config.
    pub fn validate(
        document: &ConfigDocument,
    ) -> Result<(OrganizeConfig, Vec<String>), ConfigError> {
        let mut report = ValidationReport::default();

        let input = Self::check_input(document, &mut report);
        let output = Self::check_output(document, &mut report);

        if document.fingerprint_folder.is_file() {
            report.error(format!(
                "Fingerprint folder path is a file: {}",
                document.fingerprint_folder.display()
            ));
        }

        if let (Some(input), Some(output)) = (&input, &output) {
            let input = normalize_path(input);
            let output = normalize_path(output);
            if input == output {
                report.error("Input and output folders cannot be the same");
            } else if output.starts_with(&input) {
                report.warning(
                    "Output folder is inside the input folder; it will be excluded from scanning",
                );
            }
        }

        let template = report.check(DateTemplate::parse(&document.date_format));
        let log_mode = report.check(LogMode::from_str(&document.log_mode));
        let unknown_strategy =
            report.check(UnknownDateStrategy::from_str(&document.unknown_strategy));
        let conflict_policy =
            report.check(ConflictPolicy::from_str(&document.filename_conflict_resolution));
        let hash_algorithm = report.check(HashAlgorithmKind::from_str(&document.hash_algorithm));

        let verbosity = match u8::try_from(document.verbose) {
            Ok(v) if v <= MAX_VERBOSITY => Some(v),
            _ => {
                report.error(format!(
                    "verbose must be between 0 and {}, got {}",
                    MAX_VERBOSITY, document.verbose
                ));
                None
            }
        };

        let max_file_size_mb = match u64::try_from(document.max_file_size_mb) {
            Ok(mb) if mb > 0 => {
                if document.max_file_size_mb > LARGE_FILE_SIZE_WARNING_MB {
                    report.warning(format!(
                        "max_file_size_mb is very large ({} MB); huge files slow hashing down",
                        mb
                    ));
                }
                Some(mb)
            }
            _ => {
                report.error(format!(
                    "max_file_size_mb must be greater than 0, got {}",
                    document.max_file_size_mb
                ));
                None
            }
        };

        let metadata_timeout = match u64::try_from(document.metadata_timeout_secs) {
            Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => {
                report.error(format!(
                    "metadata_timeout_secs must be greater than 0, got {}",
                    document.metadata_timeout_secs
                ));
                None
            }
        };

        if log_mode.is_some_and(|mode| mode.writes_file()) && document.log_path.is_none() {
            report.error("log_path is required when log_mode is 'file' or 'both'");
        }

        if let Some(input) = &input {
            if !has_supported_files(input, document.scan_nested) {
                report.warning(format!(
                    "No supported photo or video files found in {}",
                    input.display()
                ));
            }
        }

        let (
            Some(input_folder),
            Some(output_folder),
            Some(date_template),
            Some(log_mode),
            Some(unknown_strategy),
            Some(conflict_policy),
            Some(hash_algorithm),
            Some(verbosity),
            Some(max_file_size_mb),
            Some(metadata_timeout),
        ) = (
            input,
            output,
            template,
            log_mode,
            unknown_strategy,
            conflict_policy,
            hash_algorithm,
            verbosity,
            max_file_size_mb,
            metadata_timeout,
        )
        else {
            return Err(ConfigError::Invalid {
                errors: report.errors,
            });
        };

        if !report.is_valid() {
            return Err(ConfigError::Invalid {
                errors: report.errors,
            });
        }

        let config = OrganizeConfig {
            input_folder,
            output_folder,
            fingerprint_folder: document.fingerprint_folder.clone(),
            date_template,
            unknown_strategy,
            conflict_policy,
            scan_nested: document.scan_nested,
            include_hidden: document.include_hidden,
            hash_algorithm,
            max_file_size_mb,
            dry_run: document.dry_run,
            metadata_timeout,
            exiftool_path: document.exiftool_path.clone(),
            detail_log_limit: document.detail_log_limit,
            checkpoint_interval: document.checkpoint_interval,
            verify_copies: document.verify_copies,
            logging: LogSettings {
                mode: log_mode,
                path: document.log_path.clone(),
                verbosity,
            },
        };

        Ok((config, report.warnings))
    }

    fn check_input(document: &ConfigDocument, report: &mut ValidationReport) -> Option<PathBuf> {
        let Some(input) = &document.input_folder else {
            report.error("Missing required field: input_folder");
            return None;
        };

        if !input.exists() {
            report.error(format!("Input folder does not exist: {}", input.display()));
            return None;
        }
        if !input.is_dir() {
            report.error(format!("Input path is not a directory: {}", input.display()));
            return None;
        }
        if let Err(e) = fs::read_dir(input) {
            report.error(format!("Input folder is not readable: {} ({})", input.display(), e));
            return None;
        }
        Some(input.clone())
    }

    fn check_output(document: &ConfigDocument, report: &mut ValidationReport) -> Option<PathBuf> {
        let Some(output) = &document.output_folder else {
            report.error("Missing required field: output_folder");
            return None;
        };

        if output.exists() && !output.is_dir() {
            report.error(format!("Output path is not a directory: {}", output.display()));
            return None;
        }
        Some(output.clone())
    }
}

/// Stops at the first supported file; the scanner does the full walk.
fn has_supported_files(input: &Path, nested: bool) -> bool {
    let mut walker = WalkDir::new(input);
    if !nested {
        walker = walker.max_depth(1);
    }
    walker
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_type().is_file() && MediaKind::from_path(entry.path()).is_supported())
}
