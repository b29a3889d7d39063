//! Integration tests for loading configuration from disk.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use photo_organizer::core::config::{
    CliOverrides, ConfigLoader, ConflictPolicy, LogMode, UnknownDateStrategy,
};
use photo_organizer::core::fingerprint::HashAlgorithmKind;
use photo_organizer::error::ConfigError;
use predicates::prelude::*;

fn write_config(temp: &TempDir, body: &str) -> std::path::PathBuf {
    let file = temp.child("organizer.json");
    file.write_str(body).unwrap();
    file.path().to_path_buf()
}

#[test]
fn file_settings_are_applied() {
    let temp = TempDir::new().unwrap();
    temp.child("in/a.jpg").write_binary(b"a").unwrap();
    let path = write_config(
        &temp,
        &format!(
            r#"{{
                "input_folder": "{in}",
                "output_folder": "{out}",
                "hash_algorithm": "md5",
                "filename_conflict_resolution": "uuid_suffix",
                "unknown_strategy": "use_ctime",
                "scan_nested": false,
                "verbose": 2,
                "some_future_key": [1, 2, 3]
            }}"#,
            in = temp.path().join("in").display(),
            out = temp.path().join("out").display()
        ),
    );

    let (config, warnings) =
        ConfigLoader::load_and_validate(Some(&path), &CliOverrides::default()).unwrap();

    assert!(warnings.is_empty(), "{:?}", warnings);
    assert_eq!(config.hash_algorithm, HashAlgorithmKind::Md5);
    assert_eq!(config.conflict_policy, ConflictPolicy::UuidSuffix);
    assert_eq!(config.unknown_strategy, UnknownDateStrategy::UseCtime);
    assert!(!config.scan_nested);
    assert_eq!(config.logging.verbosity, 2);
}

#[test]
fn command_line_wins_over_the_file() {
    let temp = TempDir::new().unwrap();
    temp.child("in").create_dir_all().unwrap();
    temp.child("other").create_dir_all().unwrap();
    let path = write_config(
        &temp,
        &format!(
            r#"{{"input_folder": "{}", "output_folder": "{}", "log_mode": "console"}}"#,
            temp.path().join("in").display(),
            temp.path().join("out").display()
        ),
    );
    let overrides = CliOverrides {
        input_folder: Some(temp.path().join("other")),
        dry_run: true,
        log_mode: Some(LogMode::Both),
        log_path: Some(temp.path().join("logs/run.log")),
        ..Default::default()
    };

    let (config, _) = ConfigLoader::load_and_validate(Some(&path), &overrides).unwrap();

    assert_eq!(config.input_folder, temp.path().join("other"));
    assert!(config.dry_run);
    assert_eq!(config.logging.mode, LogMode::Both);

    ConfigLoader::create_directories(&config).unwrap();
    temp.child("logs").assert(predicate::path::is_dir());
    temp.child("out").assert(predicate::path::missing());
}

#[test]
fn every_problem_is_reported_at_once() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        r#"{"hash_algorithm": "crc32", "date_format": "%Y-%q", "verbose": 9}"#,
    );

    let error = ConfigLoader::load_and_validate(Some(&path), &CliOverrides::default()).unwrap_err();

    let ConfigError::Invalid { errors } = error else {
        panic!("expected a validation error, got {:?}", error);
    };
    let all = errors.join("\n");
    assert!(all.contains("input_folder"));
    assert!(all.contains("output_folder"));
    assert!(all.contains("crc32"));
    assert!(all.contains("%q"));
    assert!(all.contains("verbose"));
}

#[test]
fn broken_json_names_the_file() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "{ input_folder: ");

    let error = ConfigLoader::load_and_validate(Some(&path), &CliOverrides::default()).unwrap_err();

    assert!(matches!(error, ConfigError::Parse { .. }));
    assert!(error.to_string().contains("organizer.json"));
}

#[test]
fn missing_config_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope.json");

    let error =
        ConfigLoader::load_and_validate(Some(&missing), &CliOverrides::default()).unwrap_err();

    assert!(matches!(error, ConfigError::NotFound { .. }));
}
