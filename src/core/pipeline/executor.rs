//! Pipeline execution implementation.

use crate::core::config::OrganizeConfig;
use crate::core::fingerprint::{FingerprintStats, FingerprintStore};
use crate::core::metadata::{default_source, MetadataResolver, MetadataSource, ResolutionMethod};
use crate::core::organize::{
    DestinationPlanner, FileRecord, OperationRecord, OperationStatus, OperationSummary,
    TransferExecutor,
};
use crate::core::reporter;
use crate::core::scanner::{MediaFilter, MediaScanner, ScanConfig, WalkDirScanner};
use crate::error::{Result, TransferError};
use crate::events::{
    null_sender, Event, EventSender, OrganizeEvent, OrganizeProgress, PipelineEvent,
    PipelinePhase, PipelineSummary,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const LARGE_COLLECTION_WARNING: usize = 10_000;

/// Cooperative cancellation, checked between files.
///
/// Clones share the same flag, so one can be handed to a signal handler or
/// another thread while the pipeline holds the other.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeReport {
    pub summary: OperationSummary,
    /// Supported files found by the scan
    pub total_files: usize,
    /// Unreadable entries met while scanning (non-fatal)
    pub scan_errors: Vec<String>,
    pub fingerprints: FingerprintStats,
    pub dry_run: bool,
    /// Stopped early by a [`CancellationToken`]
    pub cancelled: bool,
    pub duration_ms: u64,
}

/// Builder for the organize pipeline
pub struct PipelineBuilder {
    config: OrganizeConfig,
    metadata_source: Option<Box<dyn MetadataSource>>,
    scanner: Option<Box<dyn MediaScanner>>,
    cancellation: CancellationToken,
}

impl PipelineBuilder {
    pub fn new(config: OrganizeConfig) -> Self {
        Self {
            config,
            metadata_source: None,
            scanner: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Use this metadata source instead of looking for exiftool
    pub fn metadata_source(mut self, source: Box<dyn MetadataSource>) -> Self {
        self.metadata_source = Some(source);
        self
    }

    /// Use this scanner instead of walking the input folder
    pub fn scanner(mut self, scanner: Box<dyn MediaScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn build(self) -> OrganizePipeline {
        let config = self.config;

        let source = self.metadata_source.unwrap_or_else(|| {
            default_source(config.exiftool_path.as_deref(), config.metadata_timeout)
        });

        let scanner = self.scanner.unwrap_or_else(|| {
            Box::new(WalkDirScanner::new(ScanConfig {
                nested: config.scan_nested,
                include_hidden: config.include_hidden,
                follow_symlinks: false,
                exclude: vec![config.output_folder.clone(), config.fingerprint_folder.clone()],
            }))
        });

        OrganizePipeline {
            resolver: MetadataResolver::new(source, config.unknown_strategy),
            filter: MediaFilter::new(config.max_file_size_bytes()),
            scanner,
            cancellation: self.cancellation,
            config,
        }
    }
}

/// Per-run mutable state. Created fresh by every `run`.
struct RunState {
    store: FingerprintStore,
    planner: DestinationPlanner,
    executor: TransferExecutor,
    summary: OperationSummary,
    claimed: HashSet<PathBuf>,
    seen_digests: HashSet<String>,
    copies_since_checkpoint: usize,
    total_files: usize,
    scan_errors: Vec<String>,
    cancelled: bool,
}

impl RunState {
    fn new(config: &OrganizeConfig) -> Self {
        Self {
            store: FingerprintStore::load(&config.fingerprint_folder, config.hash_algorithm),
            planner: DestinationPlanner::new(config),
            executor: TransferExecutor::new(config.dry_run),
            summary: OperationSummary::with_detail_limit(config.detail_log_limit),
            claimed: HashSet::new(),
            seen_digests: HashSet::new(),
            copies_since_checkpoint: 0,
            total_files: 0,
            scan_errors: Vec::new(),
            cancelled: false,
        }
    }
}

/// Scan → resolve → duplicate check → plan → transfer → record → summarize
pub struct OrganizePipeline {
    config: OrganizeConfig,
    resolver: MetadataResolver,
    filter: MediaFilter,
    scanner: Box<dyn MediaScanner>,
    cancellation: CancellationToken,
}

impl OrganizePipeline {
    pub fn builder(config: OrganizeConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn config(&self) -> &OrganizeConfig {
        &self.config
    }

    /// A handle that stops the run before the next file
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<OrganizeReport> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting.
    ///
    /// The fingerprint store is written before returning, even when the
    /// run is cancelled or fails (never in dry-run mode).
    pub fn run_with_events(&self, events: &EventSender) -> Result<OrganizeReport> {
        let start_time = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        info!(
            input = %self.config.input_folder.display(),
            output = %self.config.output_folder.display(),
            metadata = self.resolver.source_name(),
            dry_run = self.config.dry_run,
            "Starting organization"
        );
        if self.config.dry_run {
            info!("DRY RUN: no files will be copied and no fingerprints written");
        }

        let mut run = RunState::new(&self.config);
        let outcome = self.process(&mut run, events);

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Summarizing,
        }));
        self.flush(&run.store);

        let report = OrganizeReport {
            fingerprints: run.store.stats(),
            summary: run.summary,
            total_files: run.total_files,
            scan_errors: run.scan_errors,
            dry_run: self.config.dry_run,
            cancelled: run.cancelled,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        reporter::log_summary(&report);

        let summary = PipelineSummary {
            copied: report.summary.copied,
            skipped: report.summary.skipped,
            duplicates: report.summary.duplicates,
            errors: report.summary.errors,
            unknown: report.summary.unknown,
            duration_ms: report.duration_ms,
        };

        if let Err(e) = outcome {
            error!(error = %e, "Organization aborted");
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: e.to_string(),
                summary,
            }));
            return Err(e);
        }

        events.send(Event::Pipeline(if report.cancelled {
            PipelineEvent::Cancelled { summary }
        } else {
            PipelineEvent::Completed { summary }
        }));

        Ok(report)
    }

    fn process(&self, run: &mut RunState, events: &EventSender) -> Result<()> {
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));

        let scan = self
            .scanner
            .scan_with_events(&self.config.input_folder, events)?;
        for error in &scan.errors {
            warn!(error = %error, "Could not scan entry");
        }
        run.scan_errors = scan.errors.iter().map(ToString::to_string).collect();
        run.total_files = scan.files.len();
        if run.total_files > LARGE_COLLECTION_WARNING {
            warn!(files = run.total_files, "Large collection, this run may take a while");
        }

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Processing,
        }));
        events.send(Event::Organize(OrganizeEvent::Started {
            total_files: run.total_files,
        }));

        for (index, path) in scan.files.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                warn!(
                    processed = index,
                    total = run.total_files,
                    "Cancelled, stopping before the next file"
                );
                run.cancelled = true;
                break;
            }

            events.send(Event::Organize(OrganizeEvent::Progress(OrganizeProgress {
                completed: index,
                total: run.total_files,
                current_path: path.clone(),
            })));

            let operation = self.process_file(run, path);
            events.send(Event::Organize(OrganizeEvent::FileProcessed {
                source: operation.source.clone(),
                destination: operation.destination.clone(),
                status: operation.status,
            }));

            let copied = operation.status == OperationStatus::Copied;
            run.summary.record(operation);
            if copied {
                self.maybe_checkpoint(run, events);
            }
        }

        Ok(())
    }

    /// Take one file through every per-file stage. Never fails: problems
    /// end up in the returned record.
    fn process_file(&self, run: &mut RunState, path: &Path) -> OperationRecord {
        debug!(path = %path.display(), "Processing");

        if run.executor.is_processed(path) {
            return OperationRecord::skipped(
                path,
                TransferError::AlreadyProcessed {
                    path: path.to_path_buf(),
                }
                .to_string(),
            );
        }

        // Extracting
        let metadata = match self.filter.validate(path) {
            Ok(metadata) => metadata,
            Err(reason) => {
                info!(path = %path.display(), reason = %reason, "Skipping file");
                return OperationRecord::skipped(path, reason.to_string());
            }
        };
        let record = FileRecord::from_metadata(path, &metadata);
        let resolution = self.resolver.resolve_with_ctime(path, record.created);
        let record = record.with_resolution(resolution);
        debug!(path = %path.display(), method = %record.method, date = ?record.date, "Resolved date");

        // DuplicateCheck
        let Some(digest) = record.content_hash(&run.store).map(str::to_owned) else {
            return OperationRecord::error(path, "could not compute content hash");
        };
        if run.seen_digests.contains(&digest) {
            info!(path = %path.display(), "Duplicate of a file handled earlier in this run");
            return OperationRecord::duplicate(path, None);
        }
        if let Some(original) = run.store.duplicate_of(&digest) {
            info!(
                path = %path.display(),
                original = %original.display(),
                "Duplicate, skipping"
            );
            return OperationRecord::duplicate(path, Some(&original));
        }

        // Planning
        let destination = run.planner.plan(&record, &run.claimed);

        // Transferring
        match run.executor.copy(path, &destination) {
            Ok(_) => {}
            Err(e) if e.is_skip() => return OperationRecord::skipped(path, e.to_string()),
            Err(e) => {
                warn!(error = %e, "Copy failed");
                return OperationRecord::error(path, e.to_string()).with_destination(&destination);
            }
        }

        if self.config.verify_copies
            && !self.config.dry_run
            && !run.store.verify(&destination, &digest)
        {
            return OperationRecord::error(path, "copy does not match the source content")
                .with_destination(&destination);
        }

        // Recording
        run.claimed.insert(destination.clone());
        run.seen_digests.insert(digest.clone());
        if !self.config.dry_run {
            run.store.record(&digest, &destination);
            run.copies_since_checkpoint += 1;
        }
        if record.method == ResolutionMethod::Unknown {
            run.summary.mark_unknown_date();
        }

        info!(
            source = %path.display(),
            destination = %destination.display(),
            method = %record.method,
            "Organized"
        );
        OperationRecord::copied(path, &destination, &record.method)
    }

    fn maybe_checkpoint(&self, run: &mut RunState, events: &EventSender) {
        let interval = self.config.checkpoint_interval;
        if interval == 0 || self.config.dry_run || run.copies_since_checkpoint < interval {
            return;
        }

        match run.store.save() {
            Ok(()) => {
                run.copies_since_checkpoint = 0;
                events.send(Event::Organize(OrganizeEvent::Checkpoint {
                    fingerprints: run.store.len(),
                }));
            }
            Err(e) => warn!(error = %e, "Checkpoint failed, will retry at the end of the run"),
        }
    }

    fn flush(&self, store: &FingerprintStore) {
        if self.config.dry_run {
            debug!("Dry run, fingerprint database left untouched");
            return;
        }
        if let Err(e) = store.save() {
            error!(error = %e, "Failed to save fingerprint database");
        }
    }
}
