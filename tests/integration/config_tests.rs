//! Configuration layering: defaults, TOML file, environment, command line.

use std::fs;
use std::time::Duration;

use clap::Parser;
use dupelens::cli::{Cli, Commands, ScanArgs};
use dupelens::config::{Config, ConfigError};
use dupelens::scanner::{ExactAlgorithm, MatchMode};
use tempfile::tempdir;

use crate::{clear_env, ENV_MUTEX};

fn scan_args(extra: &[&str]) -> ScanArgs {
    let mut argv = vec!["dupelens", "scan"];
    argv.extend_from_slice(extra);
    match Cli::try_parse_from(argv).unwrap().command {
        Commands::Scan(args) => args,
    }
}

#[test]
fn test_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
mode = "visual"
chunk_size = 10
workers_per_pool = 3
exact_algorithm = "blake3"
perceptual_fallback = true
request_timeout_ms = 2500
removal_delay_ms = 800
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.mode, MatchMode::Visual);
    assert_eq!(config.chunk_size, 10);
    assert_eq!(config.workers_per_pool, 3);
    assert_eq!(config.exact_algorithm, ExactAlgorithm::Blake3);
    assert!(config.perceptual_fallback);
    assert_eq!(config.request_timeout_ms, Some(2500));
    assert_eq!(config.removal_delay(), Duration::from_millis(800));
    // Unset keys keep their defaults
    assert!(!config.follow_symlinks);
    assert_eq!(config.min_size, None);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(ref p) if *p == path));
}

#[test]
fn test_missing_file_via_load_from_path_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_malformed_toml_is_a_load_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chunk_size = \"lots\"\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chunk_size = 10\nmode = \"exact\"\n").unwrap();

    std::env::set_var("DUPELENS_CHUNK_SIZE", "75");
    std::env::set_var("DUPELENS_MODE", "visual");
    let config = Config::load(Some(&path));
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.chunk_size, 75);
    assert_eq!(config.mode, MatchMode::Visual);
}

#[test]
fn test_cli_overrides_env_and_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chunk_size = 10\nworkers_per_pool = 4\n").unwrap();

    std::env::set_var("DUPELENS_CHUNK_SIZE", "75");
    let loaded = Config::load(Some(&path));
    clear_env();

    let mut config = loaded.unwrap();
    config.merge_scan_args(&scan_args(&[
        "--chunk-size",
        "5",
        "--algorithm",
        "blake3",
        "--min-size",
        "1KB",
        "--skip-hidden",
        ".",
    ]));

    assert_eq!(config.chunk_size, 5);
    assert_eq!(config.workers_per_pool, 4);
    assert_eq!(config.exact_algorithm, ExactAlgorithm::Blake3);
    assert_eq!(config.min_size, Some(1000));
    assert!(config.skip_hidden);
    assert!(config.validate().is_ok());
}

#[test]
fn test_absent_flags_do_not_reset_file_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "follow_symlinks = true\nrequest_timeout_ms = 100\n").unwrap();

    let mut config = Config::load(Some(&path)).unwrap();
    config.merge_scan_args(&scan_args(&["."]));

    assert!(config.follow_symlinks);
    assert_eq!(config.request_timeout_ms, Some(100));
}

#[test]
fn test_validation_rejects_bad_values() {
    let cases = [
        (
            Config {
                chunk_size: 0,
                ..Config::default()
            },
            "chunk_size",
        ),
        (
            Config {
                workers_per_pool: 0,
                ..Config::default()
            },
            "workers_per_pool",
        ),
        (
            Config {
                request_timeout_ms: Some(0),
                ..Config::default()
            },
            "request_timeout_ms",
        ),
        (
            Config {
                min_size: Some(10),
                max_size: Some(5),
                ..Config::default()
            },
            "min_size",
        ),
    ];

    for (config, expected) in cases {
        match config.validate() {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, expected),
            other => panic!("expected {expected} to be rejected, got {other:?}"),
        }
    }
}

#[test]
fn test_rendered_toml_loads_back() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let config = Config {
        mode: MatchMode::Visual,
        chunk_size: 12,
        request_timeout_ms: Some(900),
        max_size: Some(4096),
        ..Config::default()
    };
    fs::write(&path, config.to_toml().unwrap()).unwrap();

    assert_eq!(Config::load(Some(&path)).unwrap(), config);
}

#[test]
fn test_finder_config_carries_settings() {
    let config = Config {
        mode: MatchMode::Visual,
        chunk_size: 7,
        workers_per_pool: 3,
        perceptual_fallback: true,
        request_timeout_ms: Some(250),
        ..Config::default()
    };

    let finder = config.finder_config();
    assert_eq!(finder.mode, MatchMode::Visual);
    assert_eq!(finder.chunk_size, 7);
    assert_eq!(finder.dispatch.workers_per_pool, 3);
    assert!(finder.dispatch.perceptual_fallback);
    assert_eq!(finder.request_timeout, Some(Duration::from_millis(250)));
    assert!(finder.shutdown_flag.is_none());
}
