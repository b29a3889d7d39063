//! # Photo Organizer
//!
//! Copies photos and videos into a `YYYY/MM` folder tree named after their
//! capture date, and never copies the same content twice.
//!
//! ## Core Philosophy
//! - **Never touch the source** - files are copied, originals stay put
//! - **Never copy twice** - a content fingerprint store survives across runs
//! - **Never lose a file** - undated files still get copied, to `unknown/`
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Configuration, scanning, date resolution, fingerprints, copying
//! - `events` - Event-driven progress reporting
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OrganizerError, Result};

use crate::core::config::LogSettings;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing for the library
///
/// Installs a console layer (stderr), a file layer appending to the
/// configured log path, or both. `RUST_LOG` overrides the level derived
/// from the verbosity. Should be called once by the application entry
/// point.
pub fn init_tracing(settings: &LogSettings) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.level()));

    let console_layer = settings
        .mode
        .writes_console()
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    let file_layer = match (&settings.path, settings.mode.writes_file()) {
        (Some(path), true) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| OrganizerError::Io {
                    path: path.clone(),
                    source,
                })?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        (None, true) => {
            return Err(OrganizerError::Logging(
                "file logging requested without a log_path".to_string(),
            ))
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| OrganizerError::Logging(e.to_string()))
}
