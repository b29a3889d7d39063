//! # Pipeline Module
//!
//! Orchestrates one organization run.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Discover supported media under the input folder
//! 2. **Process** - Per file: validate, resolve the date, check for a
//!    duplicate, plan the destination, copy, record the fingerprint
//! 3. **Summarize** - Flush the fingerprint store and report the counts
//!
//! ## Concurrency
//! Files are processed one at a time in scan order. A
//! [`CancellationToken`] is checked between files.

mod executor;

pub use executor::{CancellationToken, OrganizePipeline, OrganizeReport, PipelineBuilder};
