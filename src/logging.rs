//! Logging setup for dupelens.
//!
//! Uses the `log` facade with an `env_logger` backend. The level comes from
//! (in priority order):
//!
//! 1. `RUST_LOG`, if set
//! 2. `--quiet` (errors only) or `--verbose` (`-v` debug, `-vv` trace)
//! 3. Info otherwise
//!
//! Fingerprinting runs on named worker threads, so at debug level and above
//! each line carries the thread name (`exact-worker-0`, `perceptual-router`).
//!
//! ```rust,no_run
//! use dupelens::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("visible with -v");
//! ```

use std::env;
use std::io::Write;
use std::thread;

use env_logger::Builder;
use log::LevelFilter;

/// Initialize logging from the CLI verbosity flags.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }
    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        return;
    }

    if from_env {
        log::debug!("Logging configured from RUST_LOG");
    } else {
        log::debug!("Logging initialized at level: {:?}", level);
    }
}

/// Map CLI flags to a level; quiet wins over verbose.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);

        if verbose == 0 {
            return writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args());
        }

        let current = thread::current();
        let thread_name = current.name().unwrap_or("main");
        if verbose >= 2 {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] ({}) {}",
                buf.timestamp_millis(),
                level,
                record.module_path().unwrap_or("unknown"),
                thread_name,
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} ({}) {}",
                buf.timestamp_seconds(),
                level,
                thread_name,
                record.args()
            )
        }
    });
}

/// Name of the active maximum level.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
