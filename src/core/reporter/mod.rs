//! # Reporter Module
//!
//! Turns a finished run into the summary block written to the log.

use crate::core::organize::{OperationRecord, OperationStatus};
use crate::core::pipeline::OrganizeReport;
use tracing::info;

const RULE_WIDTH: usize = 60;

/// Glyph shown next to an operation in the detailed listing
pub fn status_indicator(status: OperationStatus) -> &'static str {
    match status {
        OperationStatus::Copied => "✓",
        OperationStatus::Duplicate => "⚠",
        OperationStatus::Skipped => "-",
        OperationStatus::Error => "✗",
    }
}

/// Lines of the summary block, without the log prefix.
///
/// The per-operation listing is included only when every operation fits
/// within the detail limit.
pub fn summary_lines(report: &OrganizeReport) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = vec![
        "=".repeat(RULE_WIDTH),
        if report.dry_run {
            "ORGANIZATION SUMMARY (DRY RUN)".to_string()
        } else {
            "ORGANIZATION SUMMARY".to_string()
        },
        "=".repeat(RULE_WIDTH),
        format!("Files copied: {}", summary.copied),
        format!("Files skipped (duplicates): {}", summary.duplicates),
        format!("Files skipped (other): {}", summary.skipped),
        format!("Files with errors: {}", summary.errors),
        format!("Files with unknown dates: {}", summary.unknown),
        format!("Total files processed: {}", summary.total_operations),
    ];

    if report.cancelled {
        lines.push(format!(
            "Run cancelled after {} of {} files",
            summary.total_operations, report.total_files
        ));
    }

    if summary.is_truncated() {
        lines.push(format!(
            "({} operations, detailed listing shown for up to {})",
            summary.total_operations,
            summary.detail_limit()
        ));
        return lines;
    }

    if !summary.operations.is_empty() {
        lines.push(String::new());
        lines.push("DETAILED OPERATIONS:".to_string());
        lines.push("-".repeat(40));
        for (i, op) in summary.operations.iter().enumerate() {
            lines.extend(operation_lines(i + 1, op));
        }
    }

    lines
}

fn operation_lines(number: usize, op: &OperationRecord) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{:3}. {} {}",
            number,
            status_indicator(op.status),
            op.status.to_string().to_uppercase()
        ),
        format!("      From: {}", op.source.display()),
    ];
    if let Some(destination) = &op.destination {
        lines.push(format!("      To:   {}", destination.display()));
    }
    if let Some(detail) = &op.detail {
        let label = if op.status == OperationStatus::Error {
            "Error"
        } else {
            "Note"
        };
        lines.push(format!("      {}: {}", label, detail));
    }
    lines
}

/// Write the summary block at `info` level
pub fn log_summary(report: &OrganizeReport) {
    for line in summary_lines(report) {
        info!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::FingerprintStats;
    use crate::core::metadata::ResolutionMethod;
    use crate::core::organize::OperationSummary;
    use std::path::Path;

    fn report(summary: OperationSummary) -> OrganizeReport {
        OrganizeReport {
            total_files: summary.total_operations,
            summary,
            scan_errors: Vec::new(),
            fingerprints: FingerprintStats::default(),
            dry_run: false,
            cancelled: false,
            duration_ms: 5,
        }
    }

    #[test]
    fn small_runs_list_every_operation() {
        let mut summary = OperationSummary::with_detail_limit(10);
        summary.record(OperationRecord::copied(
            Path::new("/in/a.jpg"),
            Path::new("/out/2020/01/a.jpg"),
            &ResolutionMethod::Filename,
        ));
        summary.record(OperationRecord::error(Path::new("/in/b.jpg"), "disk full"));

        let lines = summary_lines(&report(summary));

        assert!(lines.contains(&"Files copied: 1".to_string()));
        assert!(lines.contains(&"DETAILED OPERATIONS:".to_string()));
        assert!(lines.iter().any(|l| l.contains("To:   /out/2020/01/a.jpg")));
        assert!(lines.iter().any(|l| l.contains("Error: disk full")));
    }

    #[test]
    fn large_runs_only_show_counts() {
        let mut summary = OperationSummary::with_detail_limit(1);
        for name in ["a.jpg", "b.jpg"] {
            summary.record(OperationRecord::skipped(Path::new(name), "unsupported"));
        }

        let lines = summary_lines(&report(summary));

        assert!(lines.contains(&"Files skipped (other): 2".to_string()));
        assert!(!lines.contains(&"DETAILED OPERATIONS:".to_string()));
    }

    #[test]
    fn dry_run_is_marked_in_the_heading() {
        let mut report = report(OperationSummary::default());
        report.dry_run = true;

        assert_eq!(summary_lines(&report)[1], "ORGANIZATION SUMMARY (DRY RUN)");
    }
}
