//! End-to-end runs of the scan command.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use dupelens::cli::Cli;
use dupelens::config::ConfigError;
use dupelens::error::ExitCode;
use dupelens::output::ScanSummary;
use dupelens::run_app;
use dupelens::selection::SelectionError;
use tempfile::{tempdir, TempDir};

use crate::{clear_env, ENV_MUTEX};

struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "").unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        Self { dir, config }
    }

    fn data(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn write(&self, name: &str, contents: &[u8]) {
        fs::write(self.data().join(name), contents).unwrap();
    }

    fn summary_path(&self) -> PathBuf {
        self.dir.path().join("summary.json")
    }

    fn run(&self, extra: &[&str]) -> anyhow::Result<ExitCode> {
        let data = self.data();
        let config = self.config.to_string_lossy().into_owned();
        let mut argv = vec!["dupelens", "-q", "scan", "--config", config.as_str()];
        argv.extend_from_slice(extra);
        argv.push(data.to_str().unwrap());
        run_app(Cli::try_parse_from(argv).unwrap())
    }
}

fn read_summary(path: &Path) -> ScanSummary {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_scan_with_duplicates() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fx.write("a.txt", b"duplicate content");
    fx.write("b.txt", b"duplicate content");
    fx.write("c.txt", b"unique");

    let summary = fx.summary_path();
    let code = fx
        .run(&["--output", "json", "--summary", summary.to_str().unwrap()])
        .unwrap();

    assert_eq!(code, ExitCode::Success);
    let summary = read_summary(&summary);
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_count, 1);
    assert_eq!(summary.wasted_space, 17);
    assert_eq!(summary.top_duplicates.len(), 1);
}

#[test]
fn test_scan_without_duplicates() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fx.write("a.txt", b"one");
    fx.write("b.txt", b"two");

    assert_eq!(fx.run(&["--output", "csv"]).unwrap(), ExitCode::NoDuplicates);
}

#[test]
fn test_select_and_remove_clears_groups() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fx.write("a.txt", b"same bytes");
    fx.write("b.txt", b"same bytes");
    fx.write("c.txt", b"same bytes");

    let summary = fx.summary_path();
    let code = fx
        .run(&[
            "--select",
            "oldest",
            "--remove",
            "--summary",
            summary.to_str().unwrap(),
        ])
        .unwrap();

    // The exit code reflects the scan, not the cleanup
    assert_eq!(code, ExitCode::Success);
    let summary = read_summary(&summary);
    assert_eq!(summary.duplicate_count, 0);
    assert_eq!(summary.wasted_space, 0);
    assert_eq!(summary.total_files, 3);
}

#[test]
fn test_visual_scan_with_undecodable_image_is_partial() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fx.write("broken.png", b"not really a png");
    fx.write("a.txt", b"pair");
    fx.write("b.txt", b"pair");

    let code = fx.run(&["--mode", "visual", "--output", "json"]).unwrap();
    assert_eq!(code, ExitCode::PartialSuccess);

    let code = fx
        .run(&["--mode", "visual", "--perceptual-fallback", "--output", "json"])
        .unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_pattern_selection_requires_pattern() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fx.write("a.txt", b"x");

    let err = fx.run(&["--select", "pattern"]).unwrap_err();
    assert!(err.to_string().contains("--pattern"));
}

#[test]
fn test_invalid_pattern_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fx.write("a.txt", b"x");
    fx.write("b.txt", b"x");

    let err = fx
        .run(&["--select", "pattern", "--pattern", "copy("])
        .unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(matches!(
        err.downcast_ref::<SelectionError>(),
        Some(SelectionError::InvalidPattern { .. })
    ));
}

#[test]
fn test_invalid_pattern_is_rejected_before_walking() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fs::remove_dir(fx.data()).unwrap();

    // The missing path would fail the walk; the pattern must fail first
    let err = fx
        .run(&["--select", "pattern", "--pattern", "copy("])
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SelectionError>(),
        Some(SelectionError::InvalidPattern { .. })
    ));
    assert!(!err.to_string().contains("path not found"));
}

#[test]
fn test_missing_scan_path_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    let config = fx.config.to_string_lossy().into_owned();
    let missing = fx.dir.path().join("nowhere");

    let cli = Cli::try_parse_from([
        "dupelens",
        "-q",
        "scan",
        "--config",
        config.as_str(),
        missing.to_str().unwrap(),
    ])
    .unwrap();

    let err = run_app(cli).unwrap_err();
    assert!(err.to_string().contains("path not found"));
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fs::remove_file(&fx.config).unwrap();

    let err = fx.run(&[]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_invalid_config_is_rejected_before_scanning() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    fx.write("a.txt", b"x");

    let err = fx.run(&["--chunk-size", "0"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::Invalid {
            key: "chunk_size",
            ..
        })
    ));
}

#[test]
fn test_print_config_needs_no_paths() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let fx = Fixture::new();
    let config = fx.config.to_string_lossy().into_owned();

    let cli = Cli::try_parse_from([
        "dupelens",
        "-q",
        "scan",
        "--config",
        config.as_str(),
        "--print-config",
    ])
    .unwrap();

    assert_eq!(run_app(cli).unwrap(), ExitCode::Success);
}

#[test]
fn test_argument_conflicts() {
    assert!(Cli::try_parse_from(["dupelens", "scan", "--remove", "."]).is_err());
    assert!(Cli::try_parse_from(["dupelens", "-q", "-v", "scan", "."]).is_err());
    assert!(Cli::try_parse_from(["dupelens", "scan"]).is_err());
    assert!(Cli::try_parse_from(["dupelens", "scan", "--min-size", "10XB", "."]).is_err());
}
