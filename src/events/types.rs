//! Event type definitions for progress reporting.

use crate::core::organize::OperationStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organize pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Per-file processing events
    Organize(OrganizeEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// Progress update during scanning
    Progress(ScanProgress),
    /// An entry could not be read but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_files: usize },
}

/// Progress information during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories entered so far
    pub directories_scanned: usize,
    /// Number of supported media files found so far
    pub files_found: usize,
    /// Directory being scanned
    pub current_path: PathBuf,
}

/// Events while files are processed one by one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrganizeEvent {
    /// Processing has started
    Started { total_files: usize },
    /// A file is about to be processed
    Progress(OrganizeProgress),
    /// A file reached its final state
    FileProcessed {
        source: PathBuf,
        destination: Option<PathBuf>,
        status: OperationStatus,
    },
    /// The fingerprint store was flushed mid-run
    Checkpoint { fingerprints: usize },
}

/// Progress information during processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeProgress {
    /// Files finished so far
    pub completed: usize,
    /// Total files found by the scan
    pub total: usize,
    /// File being processed
    pub current_path: PathBuf,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline was cancelled between two files
    Cancelled { summary: PipelineSummary },
    /// Pipeline encountered a fatal error; `summary` covers the files
    /// handled before it
    Error {
        message: String,
        summary: PipelineSummary,
    },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Processing,
    Summarizing,
}

/// Counters reported when the pipeline finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub copied: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub errors: usize,
    pub unknown: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Processing => write!(f, "Processing"),
            PipelinePhase::Summarizing => write!(f, "Summarizing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Organize(OrganizeEvent::FileProcessed {
            source: PathBuf::from("/in/a.jpg"),
            destination: Some(PathBuf::from("/out/2024/07/a.jpg")),
            status: OperationStatus::Copied,
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Organize(OrganizeEvent::FileProcessed { status, .. }) => {
                assert_eq!(status, OperationStatus::Copied);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn pipeline_summary_is_serializable() {
        let summary = PipelineSummary {
            copied: 120,
            duplicates: 4,
            duration_ms: 5000,
            ..Default::default()
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"copied\":120"));
    }
}
