use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::errors::{Result, TaskboardError};

/// `RUST_LOG` sets the base filter (default `info`). `--verbose` lifts it to
/// at least `debug`, never lowering a more detailed `RUST_LOG`.
fn filter(verbose: bool) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let below_debug = filter
        .max_level_hint()
        .map_or(true, |level| level < LevelFilter::DEBUG);
    if verbose && below_debug {
        filter.add_directive(Directive::from(LevelFilter::DEBUG))
    } else {
        filter
    }
}

/// Logs to stderr. For CLI subcommands and `serve`.
pub fn init_stderr(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Logs to `path`; the terminal UI owns stdout. Keep the guard alive until
/// exit so buffered lines are flushed.
pub fn init_file(path: &Path, verbose: bool) -> Result<WorkerGuard> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|source| TaskboardError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "taskboard.log".into());
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_reaches_debug_whatever_rust_log_says() {
        let quiet = filter(false).max_level_hint();
        let verbose = filter(true).max_level_hint();
        assert!(verbose >= Some(LevelFilter::DEBUG));
        assert!(verbose >= quiet);
    }
}
