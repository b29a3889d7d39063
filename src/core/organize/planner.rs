//! Destination planning: where a file lands and under which name.

use super::types::FileRecord;
use crate::core::config::{
    ConflictPolicy, DateTemplate, OrganizeConfig, UnknownDateStrategy, RESERVED_CHARS,
};
use chrono::{Datelike, Local, NaiveDateTime};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

/// Folder (under the output root) for files without a usable date
pub const UNKNOWN_FOLDER: &str = "unknown";

const MAX_FILENAME_CHARS: usize = 200;
const MAX_SUFFIX_ATTEMPTS: u32 = 999;
const FALLBACK_FILENAME: &str = "unnamed_file";

/// Maps a file and its resolved date to a free destination path.
///
/// The planner never touches the filesystem beyond existence checks;
/// parent folders are created by the executor.
pub struct DestinationPlanner {
    input_root: PathBuf,
    output_root: PathBuf,
    template: DateTemplate,
    unknown_strategy: UnknownDateStrategy,
    conflict_policy: ConflictPolicy,
}

impl DestinationPlanner {
    pub fn new(config: &OrganizeConfig) -> Self {
        Self {
            input_root: config.input_folder.clone(),
            output_root: config.output_folder.clone(),
            template: config.date_template.clone(),
            unknown_strategy: config.unknown_strategy,
            conflict_policy: config.conflict_policy,
        }
    }

    /// Plan the destination for a file.
    ///
    /// `claimed` holds destinations already handed out in this run, so a
    /// dry run sees the same collisions a real run would.
    pub fn plan(&self, record: &FileRecord, claimed: &HashSet<PathBuf>) -> PathBuf {
        let candidate = self.destination_dir(record).join(self.file_name(record));
        self.resolve_conflict(candidate, record, claimed)
    }

    /// Folder a file belongs in, before conflict handling
    pub fn destination_dir(&self, record: &FileRecord) -> PathBuf {
        if let Some(date) = &record.date {
            return self.dated_dir(date);
        }

        if self.unknown_strategy == UnknownDateStrategy::UseCtime {
            if let Some(created) = &record.created {
                return self.dated_dir(created);
            }
        }

        let mut dir = self.output_root.join(UNKNOWN_FOLDER);
        if let Some(subdir) = record
            .path
            .strip_prefix(&self.input_root)
            .ok()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
        {
            dir.push(subdir);
        }
        dir
    }

    fn dated_dir(&self, date: &NaiveDateTime) -> PathBuf {
        self.output_root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
    }

    /// Sanitized file name: the rendered template for dated files, the
    /// original stem otherwise. The original extension is kept.
    pub fn file_name(&self, record: &FileRecord) -> String {
        let stem = match &record.date {
            Some(date) => self
                .template
                .render(date, &subsecond_token(&record.path)),
            None => record
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        let stem = sanitize_filename(&stem);
        match record.path.extension() {
            Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
            None => stem,
        }
    }

    fn resolve_conflict(
        &self,
        candidate: PathBuf,
        record: &FileRecord,
        claimed: &HashSet<PathBuf>,
    ) -> PathBuf {
        let taken = |path: &Path| claimed.contains(path) || path.exists();
        if !taken(&candidate) {
            return candidate;
        }

        match self.conflict_policy {
            ConflictPolicy::Overwrite => {
                debug!(path = %candidate.display(), "Destination exists, will overwrite");
                candidate
            }
            ConflictPolicy::UuidSuffix => with_suffix(&candidate, &random_token()),
            ConflictPolicy::TimestampSuffix => {
                let clock = conflict_clock(record);
                for counter in 1..=MAX_SUFFIX_ATTEMPTS {
                    let path = with_suffix(&candidate, &format!("{}_{:03}", clock, counter));
                    if !taken(&path) {
                        return path;
                    }
                }
                warn!(
                    path = %candidate.display(),
                    attempts = MAX_SUFFIX_ATTEMPTS,
                    "Too many name collisions, using a random suffix"
                );
                with_suffix(&candidate, &random_token())
            }
        }
    }
}

/// Replace reserved and control characters with `_`, trim dots and
/// whitespace from both ends and cap the length.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let capped: String = replaced
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();

    if capped.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        capped
    }
}

/// Three hex characters derived from the source path.
///
/// Stands in for an all-zero sub-second value; the same file always gets
/// the same token.
pub fn subsecond_token(path: &Path) -> String {
    format!("{:03X}", xxh3_64(path.to_string_lossy().as_bytes()) & 0xFFF)
}

/// `HHMMSS` used in timestamp suffixes: the file's own time when known, so
/// planning the same file twice gives the same answer
fn conflict_clock(record: &FileRecord) -> String {
    record
        .date
        .or(record.created)
        .unwrap_or_else(|| Local::now().naive_local())
        .format("%H%M%S")
        .to_string()
}

fn random_token() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::ResolutionMethod;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn date(micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 16)
            .unwrap()
            .and_hms_micro_opt(18, 22, 7, micro)
            .unwrap()
    }

    fn config(temp: &TempDir) -> OrganizeConfig {
        OrganizeConfig::new(temp.path().join("in"), temp.path().join("out"))
    }

    fn dated(temp: &TempDir, name: &str, date: NaiveDateTime) -> FileRecord {
        let mut record = FileRecord::new(temp.path().join("in").join(name), 10);
        record.date = Some(date);
        record.method = ResolutionMethod::Filename;
        record
    }

    #[test]
    fn dated_file_goes_to_year_month() {
        let temp = TempDir::new().unwrap();
        let planner = DestinationPlanner::new(&config(&temp));

        let path = planner.plan(&dated(&temp, "IMG_1.JPG", date(123_456)), &HashSet::new());

        assert_eq!(
            path,
            temp.path().join("out/2024/07/2024-07-16 at 18-22-07 (123).JPG")
        );
    }

    #[test]
    fn zero_subseconds_get_a_stable_token() {
        let temp = TempDir::new().unwrap();
        let planner = DestinationPlanner::new(&config(&temp));
        let record = dated(&temp, "a.jpg", date(0));

        let name = planner.file_name(&record);

        assert!(!name.contains("(000)"));
        assert_eq!(name, planner.file_name(&record));
        assert!(name.ends_with(&format!("({}).jpg", subsecond_token(&record.path))));
    }

    #[test]
    fn undated_file_keeps_relative_folder_under_unknown() {
        let temp = TempDir::new().unwrap();
        let planner = DestinationPlanner::new(&config(&temp));

        let nested = FileRecord::new(temp.path().join("in/trip/day1/beach.png"), 10);
        let top = FileRecord::new(temp.path().join("in/beach.png"), 10);

        assert_eq!(
            planner.plan(&nested, &HashSet::new()),
            temp.path().join("out/unknown/trip/day1/beach.png")
        );
        assert_eq!(
            planner.plan(&top, &HashSet::new()),
            temp.path().join("out/unknown/beach.png")
        );
    }

    #[test]
    fn use_ctime_files_by_creation_time_with_original_name() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.unknown_strategy = UnknownDateStrategy::UseCtime;
        let planner = DestinationPlanner::new(&config);

        let mut record = FileRecord::new(temp.path().join("in/x/beach.png"), 10);
        record.created = Some(date(0));

        assert_eq!(
            planner.plan(&record, &HashSet::new()),
            temp.path().join("out/2024/07/beach.png")
        );
    }

    #[test]
    fn timestamp_suffix_counts_up_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let planner = DestinationPlanner::new(&config(&temp));
        let record = dated(&temp, "a.jpg", date(500_000));

        let first = planner.plan(&record, &HashSet::new());
        fs::create_dir_all(first.parent().unwrap()).unwrap();
        fs::write(&first, b"taken").unwrap();

        let second = planner.plan(&record, &HashSet::new());
        assert_eq!(
            second.file_name().unwrap().to_string_lossy(),
            "2024-07-16 at 18-22-07 (500)_182207_001.jpg"
        );
        assert_eq!(second, planner.plan(&record, &HashSet::new()));

        let claimed: HashSet<PathBuf> = [second.clone()].into_iter().collect();
        let third = planner.plan(&record, &claimed);
        assert!(third.to_string_lossy().ends_with("_182207_002.jpg"));
    }

    #[test]
    fn claimed_paths_collide_without_touching_disk() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.conflict_policy = ConflictPolicy::UuidSuffix;
        let planner = DestinationPlanner::new(&config);
        let record = dated(&temp, "a.jpg", date(1_000));

        let first = planner.plan(&record, &HashSet::new());
        let claimed: HashSet<PathBuf> = [first.clone()].into_iter().collect();
        let second = planner.plan(&record, &claimed);

        assert_ne!(first, second);
        assert_eq!(first.parent(), second.parent());
        let stem = second.file_stem().unwrap().to_string_lossy().into_owned();
        let token = stem.rsplit('_').next().unwrap();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn overwrite_returns_colliding_path() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.conflict_policy = ConflictPolicy::Overwrite;
        let planner = DestinationPlanner::new(&config);
        let record = dated(&temp, "a.jpg", date(1_000));

        let first = planner.plan(&record, &HashSet::new());
        let claimed: HashSet<PathBuf> = [first.clone()].into_iter().collect();

        assert_eq!(planner.plan(&record, &claimed), first);
    }

    #[test]
    fn sanitize_replaces_reserved_and_trims() {
        assert_eq!(sanitize_filename("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("  ..holiday.. "), "holiday");
        assert_eq!(sanitize_filename(" ... "), "unnamed_file");
        assert_eq!(sanitize_filename(&"x".repeat(300)).chars().count(), 200);
    }

    #[test]
    fn sanitize_output_is_always_safe() {
        for name in ["", "???", "a\u{0}b", ".", "\t\n", "ok name", "日本語の写真"] {
            let clean = sanitize_filename(name);
            assert!(!clean.is_empty());
            assert!(clean.chars().count() <= 200);
            assert!(!clean.chars().any(|c| RESERVED_CHARS.contains(&c) || c.is_control()));
            assert!(!clean.starts_with('.') && !clean.ends_with('.'));
        }
    }
}
