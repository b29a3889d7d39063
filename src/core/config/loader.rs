//! Reading the configuration document and merging CLI overrides.

use super::{ConfigDocument, ConfigValidator, LogMode, OrganizeConfig};
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Values given on the command line. Each one that is set wins over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub input_folder: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub fingerprint_folder: Option<PathBuf>,
    pub date_format: Option<String>,
    pub dry_run: bool,
    pub verbose: Option<u8>,
    pub log_mode: Option<LogMode>,
    pub log_path: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Read and parse a configuration file.
    pub fn load_file(path: &Path) -> Result<ConfigDocument, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text, path)
    }

    /// Parse a configuration document. `origin` is only used in errors.
    pub fn parse(text: &str, origin: &Path) -> Result<ConfigDocument, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides(mut document: ConfigDocument, overrides: &CliOverrides) -> ConfigDocument {
        if let Some(input) = &overrides.input_folder {
            document.input_folder = Some(input.clone());
        }
        if let Some(output) = &overrides.output_folder {
            document.output_folder = Some(output.clone());
        }
        if let Some(folder) = &overrides.fingerprint_folder {
            document.fingerprint_folder = folder.clone();
        }
        if let Some(format) = &overrides.date_format {
            document.date_format = format.clone();
        }
        if overrides.dry_run {
            document.dry_run = true;
        }
        if let Some(verbose) = overrides.verbose {
            document.verbose = i64::from(verbose);
        }
        if let Some(mode) = overrides.log_mode {
            document.log_mode = mode.as_str().to_string();
        }
        if let Some(path) = &overrides.log_path {
            document.log_path = Some(path.clone());
        }
        document
    }

    /// Expand `~` and make every path absolute against `base`.
    pub fn resolve_paths(mut document: ConfigDocument, base: &Path) -> ConfigDocument {
        document.input_folder = document.input_folder.map(|p| resolve_path(&p, base));
        document.output_folder = document.output_folder.map(|p| resolve_path(&p, base));
        document.fingerprint_folder = resolve_path(&document.fingerprint_folder, base);
        document.log_path = document.log_path.map(|p| resolve_path(&p, base));
        document.exiftool_path = document.exiftool_path.map(|p| expand_home(&p));
        document
    }

    /// Load the optional file, apply overrides, resolve paths and validate.
    ///
    /// Returns the immutable configuration plus any warnings. Every
    /// validation error is reported at once.
    pub fn load_and_validate(
        config_path: Option<&Path>,
        overrides: &CliOverrides,
    ) -> Result<(OrganizeConfig, Vec<String>), ConfigError> {
        let document = match config_path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                Self::load_file(path)?
            }
            None => ConfigDocument::default(),
        };

        let base = std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;

        let document = Self::resolve_paths(Self::apply_overrides(document, overrides), &base);
        ConfigValidator::validate(&document)
    }

    /// Create the folders a run writes to.
    ///
    /// Output and fingerprint folders are left alone in dry-run mode; the
    /// log folder is always created when file logging is on.
    pub fn create_directories(config: &OrganizeConfig) -> Result<(), ConfigError> {
        let mut folders: Vec<&Path> = Vec::new();
        if !config.dry_run {
            folders.push(&config.output_folder);
            folders.push(&config.fingerprint_folder);
        }
        if config.logging.mode.writes_file() {
            if let Some(parent) = config.logging.path.as_deref().and_then(Path::parent) {
                folders.push(parent);
            }
        }

        for folder in folders {
            if folder.as_os_str().is_empty() {
                continue;
            }
            fs::create_dir_all(folder).map_err(|source| ConfigError::CreateDirectory {
                path: folder.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}
