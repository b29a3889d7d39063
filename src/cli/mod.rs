//! # CLI Module
//!
//! Command-line interface for the photo organizer.
//!
//! ## Usage
//! ```bash
//! # Organize a camera dump into ~/Photos/YYYY/MM
//! photo-organizer --input ~/Camera --output ~/Photos
//!
//! # Settings from a file, command-line flags win
//! photo-organizer --config organizer.json --output /mnt/archive
//!
//! # See what would happen
//! photo-organizer -i ~/Camera -o ~/Photos --dry-run -v
//!
//! # JSON output
//! photo-organizer -i ~/Camera -o ~/Photos --format json
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_organizer::core::config::{CliOverrides, ConfigLoader, LogMode, OrganizeConfig};
use photo_organizer::core::fingerprint::FingerprintStore;
use photo_organizer::core::pipeline::{OrganizePipeline, OrganizeReport};
use photo_organizer::error::Result;
use photo_organizer::events::{Event, EventChannel, OrganizeEvent, PipelineEvent, ScanEvent};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use tracing::{error, warn};

/// Photo Organizer - Sort photos and videos by capture date, never twice
#[derive(Parser, Debug)]
#[command(name = "photo-organizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder to read photos and videos from
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Folder to build the dated tree in
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Folder holding the fingerprint database
    #[arg(long)]
    fingerprint_folder: Option<PathBuf>,

    /// File name template (strftime tokens)
    #[arg(long)]
    date_format: Option<String>,

    /// Show what would be copied without touching anything
    #[arg(short, long)]
    dry_run: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Where log output goes
    #[arg(long)]
    log_mode: Option<LogModeArg>,

    /// Log file used by the file and both log modes
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "pretty")]
    format: OutputFormat,

    /// Write a fingerprint database report to this file after the run
    #[arg(long)]
    fingerprint_report: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogModeArg {
    /// Standard error only
    Console,
    /// Log file only
    File,
    /// Standard error and the log file
    Both,
}

impl From<LogModeArg> for LogMode {
    fn from(mode: LogModeArg) -> Self {
        match mode {
            LogModeArg::Console => LogMode::Console,
            LogModeArg::File => LogMode::File,
            LogModeArg::Both => LogMode::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            input_folder: self.input.clone(),
            output_folder: self.output.clone(),
            fingerprint_folder: self.fingerprint_folder.clone(),
            date_format: self.date_format.clone(),
            dry_run: self.dry_run,
            verbose: (self.verbose > 0).then_some(self.verbose),
            log_mode: self.log_mode.map(LogMode::from),
            log_path: self.log_path.clone(),
        }
    }
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let term = Term::stderr();

    // Logging is not set up yet, so configuration problems go straight to stderr
    let (config, warnings) = match ConfigLoader::load_and_validate(cli.config.as_deref(), &cli.overrides()) {
        Ok(loaded) => loaded,
        Err(e) => {
            term.write_line(&format!("{} {}", style("Error:").red().bold(), e)).ok();
            return ExitCode::from(2);
        }
    };

    if let Err(e) = ConfigLoader::create_directories(&config) {
        term.write_line(&format!("{} {}", style("Error:").red().bold(), e)).ok();
        return ExitCode::from(2);
    }

    if let Err(e) = photo_organizer::init_tracing(&config.logging) {
        term.write_line(&format!("{} {}", style("Warning:").yellow().bold(), e)).ok();
    }

    for warning in &warnings {
        warn!("{}", warning);
    }

    match run_organize(&cli, config, &term) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Organization failed");
            term.write_line(&format!("{} {}", style("Error:").red().bold(), e)).ok();
            ExitCode::FAILURE
        }
    }
}

fn run_organize(cli: &Cli, config: OrganizeConfig, term: &Term) -> Result<()> {
    let pretty = cli.format == OutputFormat::Pretty;

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Photo Organizer").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        if config.dry_run {
            term.write_line(&format!("{}", style("Dry run: nothing will be written").yellow()))
                .ok();
        }
        term.write_line("").ok();
    }

    let fingerprint_folder = config.fingerprint_folder.clone();
    let algorithm = config.hash_algorithm;
    let pipeline = OrganizePipeline::builder(config).build();

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = pretty.then(|| {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    });

    let progress_clone = progress.clone();
    let verbose = cli.verbose > 0;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            // Drain so the pipeline never blocks on a full channel
            for _ in receiver.iter() {}
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_message(format!("Scanning... {} files", p.files_found));
                }
                Event::Scan(ScanEvent::Completed { total_files }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Organize(OrganizeEvent::Progress(p)) => {
                    if verbose {
                        pb.set_message(
                            p.current_path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Organize(OrganizeEvent::FileProcessed { .. }) => {
                    pb.inc(1);
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Cancelled { .. })
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let report = result?;

    match cli.format {
        OutputFormat::Pretty => print_pretty_results(term, &report),
        OutputFormat::Json => print_json_results(&report),
    }

    if let Some(path) = &cli.fingerprint_report {
        FingerprintStore::load(&fingerprint_folder, algorithm).export_report(path)?;
        if pretty {
            term.write_line(&format!(
                "  Fingerprint report written to {}",
                style(path.display()).cyan()
            ))
            .ok();
        }
    }

    Ok(())
}

fn print_pretty_results(term: &Term, report: &OrganizeReport) {
    let summary = &report.summary;

    term.write_line("").ok();
    let heading = if report.cancelled {
        format!("{} Organization Cancelled", style("!").yellow().bold())
    } else {
        format!("{} Organization Complete", style("✓").green().bold())
    };
    term.write_line(&heading).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files found in {:.1}s",
        style(report.total_files).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();

    let copied_label = if report.dry_run { "would be copied" } else { "copied" };
    term.write_line(&format!("  {} {}", style(summary.copied).green(), copied_label))
        .ok();
    term.write_line(&format!(
        "  {} duplicates skipped",
        style(summary.duplicates).yellow()
    ))
    .ok();
    if summary.skipped > 0 {
        term.write_line(&format!("  {} skipped", style(summary.skipped).dim()))
            .ok();
    }
    if summary.unknown > 0 {
        term.write_line(&format!(
            "  {} without a date (in unknown/)",
            style(summary.unknown).yellow()
        ))
        .ok();
    }
    if summary.errors > 0 {
        term.write_line(&format!("  {} errors", style(summary.errors).red().bold()))
            .ok();
    }
    if !report.scan_errors.is_empty() {
        term.write_line(&format!(
            "  {} entries could not be scanned",
            style(report.scan_errors.len()).red()
        ))
        .ok();
    }

    term.write_line(&format!(
        "  {} fingerprints on record ({})",
        style(report.fingerprints.total_fingerprints).dim(),
        format_bytes(report.fingerprints.total_size_bytes)
    ))
    .ok();

    term.write_line("").ok();

    // Footer
    let footer = if report.dry_run {
        "Dry run: no files were copied and no fingerprints were saved."
    } else {
        "Originals were left untouched."
    };
    term.write_line(&format!("{}", style(footer).dim())).ok();
}

fn print_json_results(report: &OrganizeReport) {
    let status = if report.cancelled { "cancelled" } else { "complete" };
    let output = serde_json::json!({
        "status": status,
        "dry_run": report.dry_run,
        "total_files": report.total_files,
        "duration_ms": report.duration_ms,
        "summary": report.summary,
        "scan_errors": report.scan_errors,
        "fingerprints": report.fingerprints,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => error!(error = %e, "Could not serialize the summary"),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_picks_the_unit() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "photo-organizer",
            "-i",
            "/in",
            "-o",
            "/out",
            "--dry-run",
            "-vv",
            "--log-mode",
            "both",
        ]);
        let overrides = cli.overrides();

        assert_eq!(overrides.input_folder, Some(PathBuf::from("/in")));
        assert_eq!(overrides.output_folder, Some(PathBuf::from("/out")));
        assert!(overrides.dry_run);
        assert_eq!(overrides.verbose, Some(2));
        assert_eq!(overrides.log_mode, Some(LogMode::Both));
    }

    #[test]
    fn no_verbose_flag_keeps_the_configured_level() {
        let cli = Cli::parse_from(["photo-organizer", "-c", "organizer.json"]);
        assert_eq!(cli.overrides().verbose, None);
    }
}
