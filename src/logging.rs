//! Logging setup on the `log` facade with an `env_logger` backend.
//!
//! Level selection, highest priority first:
//!
//! 1. `RUST_LOG`, if set
//! 2. `--quiet` (errors only)
//! 3. `-v` (debug) / `-vv` (trace)
//! 4. info
//!
//! The HTTP stack is capped at `warn` below trace level so request plumbing
//! does not drown out per-note progress. Debug builds prefix records with a
//! timestamp, and with the module path once `-v` is given.
//!
//! ```rust,no_run
//! use vaultdigest::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("Loaded 42 cached summaries");
//! ```

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Crates whose records are capped at `warn` unless tracing.
const NOISY_CRATES: &[&str] = &["reqwest", "hyper", "hyper_util", "rustls", "h2"];

/// Initialize logging from the CLI verbosity flags.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();
    let level = determine_level(verbose, quiet);

    if env::var_os("RUST_LOG").is_some() {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
        if level < LevelFilter::Trace {
            for name in NOISY_CRATES {
                builder.filter_module(name, LevelFilter::Warn.min(level));
            }
        }
    }

    configure_format(&mut builder, verbose);

    if builder.try_init().is_ok() {
        log::debug!("Logging initialized at level: {:?}", log::max_level());
    }
}

/// Map CLI flags to a level filter. `quiet` wins over `verbose`.
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

#[cfg(debug_assertions)]
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        let timestamp = buf.timestamp_seconds();

        if verbose >= 1 {
            writeln!(
                buf,
                "{timestamp} {style}{level:<5}{style:#} [{}] {}",
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{timestamp} {style}{level:<5}{style:#} {}", record.args())
        }
    });
}

#[cfg(not(debug_assertions))]
fn configure_format(builder: &mut Builder, _verbose: u8) {
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{level:<5}{style:#} {}", record.args())
    });
}
