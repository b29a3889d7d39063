//! Metadata sources: the `exiftool` subprocess and an embedded EXIF reader.

use crate::error::MetadataError;
use crossbeam_channel::{bounded, Sender};
use exif::{In, Reader, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Flat `field name -> value` map, e.g. `"EXIF:DateTimeOriginal" -> "2024:07:16 18:22:07"`
pub type FieldMap = HashMap<String, String>;

const DEFAULT_PROGRAM: &str = "exiftool";
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const OUTPUT_GRACE: Duration = Duration::from_secs(1);

/// Anything that can report the metadata fields of a file
pub trait MetadataSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Read every metadata field of a file.
    fn read_fields(&self, path: &Path) -> Result<FieldMap, MetadataError>;
}

/// Runs `exiftool -json` once per file.
#[derive(Debug, Clone)]
pub struct ExifToolSource {
    program: PathBuf,
    timeout: Duration,
}

impl ExifToolSource {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Find a working exiftool: the configured program, or `exiftool` on `PATH`.
    pub fn locate(configured: Option<&Path>, timeout: Duration) -> Option<Self> {
        let program = configured
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM));

        let mut version_check = Command::new(&program);
        version_check.arg("-ver");

        match run_with_timeout(version_check, VERSION_CHECK_TIMEOUT) {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                debug!(program = %program.display(), %version, "Found exiftool");
                Some(Self::new(program, timeout))
            }
            Ok(output) => {
                debug!(program = %program.display(), status = %output.status, "exiftool version check failed");
                None
            }
            Err(e) => {
                debug!(program = %program.display(), error = ?e, "exiftool not available");
                None
            }
        }
    }
}

impl MetadataSource for ExifToolSource {
    fn name(&self) -> &'static str {
        "exiftool"
    }

    fn read_fields(&self, path: &Path) -> Result<FieldMap, MetadataError> {
        let mut command = Command::new(&self.program);
        command
            .args(["-json", "-charset", "UTF8", "-api", "largefilesupport=1"])
            .arg(path);

        let output = run_with_timeout(command, self.timeout).map_err(|e| match e {
            RunError::TimedOut => MetadataError::Timeout {
                path: path.to_path_buf(),
                seconds: self.timeout.as_secs(),
            },
            RunError::Spawn(source) | RunError::Wait(source) => MetadataError::Spawn {
                program: self.program.clone(),
                source,
            },
        })?;

        if !output.status.success() {
            return Err(MetadataError::ExitStatus {
                path: path.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_exiftool_json(path, &output.stdout)
    }
}

/// Parse `exiftool -json` output: an array with one object per file.
fn parse_exiftool_json(path: &Path, stdout: &[u8]) -> Result<FieldMap, MetadataError> {
    let parse_error = |reason: String| MetadataError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let records: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(stdout).map_err(|e| parse_error(e.to_string()))?;
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| parse_error("empty result".to_string()))?;

    Ok(record
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect())
}

#[derive(Debug)]
enum RunError {
    Spawn(io::Error),
    Wait(io::Error),
    TimedOut,
}

/// Run a command, killing it if it outlives `timeout`.
fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Output, RunError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(RunError::Spawn)?;

    // Drain both pipes on their own threads so a chatty child can't block
    let (tx, rx) = bounded::<(usize, Vec<u8>)>(2);
    drain(child.stdout.take(), tx.clone(), 0);
    drain(child.stderr.take(), tx, 1);

    let deadline = Instant::now() + timeout;
    let status: ExitStatus = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                stop(&mut child);
                return Err(RunError::TimedOut);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                stop(&mut child);
                return Err(RunError::Wait(e));
            }
        }
    };

    let mut streams = [Vec::new(), Vec::new()];
    for _ in 0..2 {
        match rx.recv_timeout(OUTPUT_GRACE) {
            Ok((slot, bytes)) => streams[slot] = bytes,
            Err(_) => break,
        }
    }
    let [stdout, stderr] = streams;

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Kill and reap a child that is being abandoned
fn stop(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(pid = child.id(), error = %e, "Could not kill metadata tool");
    }
    if let Err(e) = child.wait() {
        warn!(pid = child.id(), error = %e, "Could not reap metadata tool");
    }
}

fn drain<R: Read + Send + 'static>(reader: Option<R>, tx: Sender<(usize, Vec<u8>)>, slot: usize) {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut reader) = reader {
            if let Err(e) = reader.read_to_end(&mut buffer) {
                debug!(slot, error = %e, "Metadata tool output cut short");
            }
        }
        let _ = tx.send((slot, buffer));
    });
}

/// Reads EXIF tags straight from the file with kamadak-exif.
///
/// Covers JPEG, TIFF, HEIF, PNG and WebP containers; videos yield nothing.
/// Field names carry an `EXIF:` prefix, the same as exiftool's group names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedExifSource;

impl MetadataSource for EmbeddedExifSource {
    fn name(&self) -> &'static str {
        "embedded-exif"
    }

    fn read_fields(&self, path: &Path) -> Result<FieldMap, MetadataError> {
        let file = File::open(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut bufreader = BufReader::new(file);
        let exif = Reader::new()
            .read_from_container(&mut bufreader)
            .map_err(|e| MetadataError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut fields = FieldMap::new();
        for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
            let value = match &field.value {
                Value::Ascii(parts) => parts.first().map(|bytes| {
                    String::from_utf8_lossy(bytes)
                        .trim_end_matches('\0')
                        .trim()
                        .to_string()
                }),
                other => Some(other.display_as(field.tag).to_string()),
            };

            if let Some(value) = value.filter(|v| !v.is_empty()) {
                fields.entry(format!("EXIF:{}", field.tag)).or_insert(value);
            }
        }

        Ok(fields)
    }
}

/// Pick the best available source: exiftool when installed, otherwise the
/// embedded reader.
pub fn default_source(configured: Option<&Path>, timeout: Duration) -> Box<dyn MetadataSource> {
    match ExifToolSource::locate(configured, timeout) {
        Some(tool) => {
            info!(program = %tool.program.display(), "Using exiftool for metadata");
            Box::new(tool)
        }
        None => {
            warn!("exiftool not found; falling back to the embedded EXIF reader (video dates will come from filenames or file times)");
            Box::new(EmbeddedExifSource)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_exiftool_json_values() {
        let json = br#"[{
            "SourceFile": "/in/a.jpg",
            "EXIF:DateTimeOriginal": "2024:07:16 18:22:07",
            "EXIF:SubSecTimeOriginal": 45,
            "Composite:Flash": true,
            "XMP:Subject": ["a", "b"]
        }]"#;

        let fields = parse_exiftool_json(Path::new("/in/a.jpg"), json).unwrap();

        assert_eq!(fields["EXIF:DateTimeOriginal"], "2024:07:16 18:22:07");
        assert_eq!(fields["EXIF:SubSecTimeOriginal"], "45");
        assert_eq!(fields["Composite:Flash"], "true");
        assert!(!fields.contains_key("XMP:Subject"));
    }

    #[test]
    fn empty_or_invalid_output_is_a_parse_error() {
        assert!(parse_exiftool_json(Path::new("a.jpg"), b"[]").is_err());
        assert!(parse_exiftool_json(Path::new("a.jpg"), b"Error: nope").is_err());
    }

    #[test]
    fn missing_program_is_not_located() {
        let located = ExifToolSource::locate(
            Some(Path::new("/definitely/not/a/real/exiftool")),
            Duration::from_secs(1),
        );
        assert!(located.is_none());
    }

    #[test]
    fn embedded_reader_rejects_non_exif_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fake.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        assert!(EmbeddedExifSource.read_fields(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let result = run_with_timeout(command, Duration::from_millis(100));
        assert!(matches!(result, Err(RunError::TimedOut)));
    }

    #[cfg(unix)]
    #[test]
    fn command_output_is_captured() {
        let mut command = Command::new("echo");
        command.arg("hello");
        let output = run_with_timeout(command, Duration::from_secs(5)).unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn stopping_a_finished_child_is_harmless() {
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().unwrap();

        stop(&mut child);
        stop(&mut child);

        assert!(child.try_wait().unwrap().is_some());
    }
}
