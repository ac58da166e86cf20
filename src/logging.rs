//! Logging setup on top of `tracing-subscriber`.
//!
//! `RUST_LOG` wins when set. Otherwise the level follows the CLI flags:
//! `-q` errors only, default warnings, `-v` info, `-vv` debug, `-vvv` trace.

use anyhow::{Context, Result, anyhow};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Level used when `RUST_LOG` is not set.
#[must_use]
pub const fn default_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber, writing to stderr or appending to `log_file`.
/// With `json` set every event is one JSON object per line.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global subscriber
/// is already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>, json: bool) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose, quiet).into())
        .from_env_lossy();

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), !json),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_writer(writer);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("{e}"))
}

/// Route logs through the test harness' captured output. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_follows_flags() {
        assert_eq!(default_level(0, true), LevelFilter::ERROR);
        assert_eq!(default_level(3, true), LevelFilter::ERROR);
        assert_eq!(default_level(0, false), LevelFilter::WARN);
        assert_eq!(default_level(1, false), LevelFilter::INFO);
        assert_eq!(default_level(2, false), LevelFilter::DEBUG);
        assert_eq!(default_level(7, false), LevelFilter::TRACE);
    }
}
