//! # Core Module
//!
//! The UI-agnostic organization engine.
//!
//! ## Modules
//! - `config` - Loads, merges and validates run settings
//! - `scanner` - Discovers supported media in the input folder
//! - `metadata` - Resolves the capture date of a file
//! - `fingerprint` - Content digests and the persistent fingerprint store
//! - `organize` - Plans destinations and copies files
//! - `pipeline` - Orchestrates the full workflow
//! - `reporter` - Summarizes a finished run

pub mod config;
pub mod fingerprint;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod reporter;
pub mod scanner;

// Re-export commonly used types
pub use config::OrganizeConfig;
pub use fingerprint::{FingerprintStore, HashAlgorithmKind};
pub use metadata::{DateResolution, MetadataSource, ResolutionMethod};
pub use organize::{OperationStatus, OperationSummary};
pub use pipeline::{CancellationToken, OrganizePipeline, OrganizeReport};
pub use scanner::MediaKind;
